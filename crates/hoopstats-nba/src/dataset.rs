// Input dataset loading: the per-player season stats CSV exported by the
// stats scraper (one row per player, NBA stats API column names).

use csv::StringRecord;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Columns the loader reads. Any others in the file are ignored.
pub const REQUIRED_COLUMNS: [&str; 17] = [
    "PLAYER_ID",
    "PLAYER_NAME",
    "TEAM_ABBREVIATION",
    "POSITION",
    "GP",
    "MIN",
    "FG_PCT",
    "FG3_PCT",
    "FT_PCT",
    "REB",
    "AST",
    "TOV",
    "STL",
    "BLK",
    "PTS",
    "PLUS_MINUS",
    "NBA_FANTASY_PTS",
];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Stat cells exactly as they appear in the file. Cleaning happens at load
/// time, so blanks and junk survive until then.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStats {
    pub gp: Option<String>,
    pub min: Option<String>,
    pub fg_pct: Option<String>,
    pub fg3_pct: Option<String>,
    pub ft_pct: Option<String>,
    pub reb: Option<String>,
    pub ast: Option<String>,
    pub tov: Option<String>,
    pub stl: Option<String>,
    pub blk: Option<String>,
    pub pts: Option<String>,
    pub plus_minus: Option<String>,
    pub nba_fantasy_pts: Option<String>,
}

/// One input row with its identity fields validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    /// External (stats provider) player id.
    pub player_id: i64,
    pub player_name: String,
    pub team_abbreviation: String,
    /// `None` when the roster join found no position.
    pub position: Option<String>,
    pub stats: RawStats,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {origin}: {source}")]
    Csv { origin: String, source: csv::Error },

    #[error("{origin} is missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        origin: String,
        columns: Vec<String>,
    },

    #[error("{origin} line {line}: invalid PLAYER_ID {value:?}")]
    InvalidPlayerId {
        origin: String,
        line: u64,
        value: String,
    },

    #[error("{origin} line {line}: missing value for {column}")]
    MissingValue {
        origin: String,
        line: u64,
        column: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawStatRecord {
    player_id: Option<String>,
    player_name: Option<String>,
    team_abbreviation: Option<String>,
    position: Option<String>,
    gp: Option<String>,
    min: Option<String>,
    fg_pct: Option<String>,
    fg3_pct: Option<String>,
    ft_pct: Option<String>,
    reb: Option<String>,
    ast: Option<String>,
    tov: Option<String>,
    stl: Option<String>,
    blk: Option<String>,
    pts: Option<String>,
    plus_minus: Option<String>,
    nba_fantasy_pts: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Accepts `101` as well as the `101.0` a float column export produces.
fn parse_player_id(raw: &str) -> Option<i64> {
    let text = raw.trim();
    text.parse::<i64>().ok().or_else(|| {
        let value = text.parse::<f64>().ok()?;
        let integral = value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15;
        integral.then_some(value as i64)
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_rows<R: Read>(rdr: R, origin: &str) -> Result<Vec<StatRow>, DatasetError> {
    let csv_err = |source: csv::Error| DatasetError::Csv {
        origin: origin.to_string(),
        source,
    };

    let mut reader = csv::Reader::from_reader(rdr);
    let headers: StringRecord = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::trim)
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DatasetError::MissingColumns {
            origin: origin.to_string(),
            columns: missing,
        });
    }

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).map_err(csv_err)? {
        let line = record.position().map_or(0, |p| p.line());
        let raw: RawStatRecord = record.deserialize(Some(&headers)).map_err(csv_err)?;

        let id_text = raw.player_id.unwrap_or_default();
        let player_id =
            parse_player_id(&id_text).ok_or_else(|| DatasetError::InvalidPlayerId {
                origin: origin.to_string(),
                line,
                value: id_text.clone(),
            })?;

        let team_abbreviation =
            non_blank(raw.team_abbreviation).ok_or_else(|| DatasetError::MissingValue {
                origin: origin.to_string(),
                line,
                column: "TEAM_ABBREVIATION",
            })?;

        rows.push(StatRow {
            player_id,
            player_name: raw.player_name.unwrap_or_default().trim().to_string(),
            team_abbreviation,
            position: non_blank(raw.position),
            stats: RawStats {
                gp: raw.gp,
                min: raw.min,
                fg_pct: raw.fg_pct,
                fg3_pct: raw.fg3_pct,
                ft_pct: raw.ft_pct,
                reb: raw.reb,
                ast: raw.ast,
                tov: raw.tov,
                stl: raw.stl,
                blk: raw.blk,
                pts: raw.pts,
                plus_minus: raw.plus_minus,
                nba_fantasy_pts: raw.nba_fantasy_pts,
            },
        });
    }

    debug!(origin, rows = rows.len(), "dataset read");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Public loaders
// ---------------------------------------------------------------------------

/// Read stat rows from any reader (a file, an in-memory buffer in tests).
pub fn read_stat_rows<R: Read>(rdr: R) -> Result<Vec<StatRow>, DatasetError> {
    read_rows(rdr, "input")
}

/// Read stat rows from a CSV file.
pub fn load_stat_rows(path: &Path) -> Result<Vec<StatRow>, DatasetError> {
    let file = std::fs::File::open(path).map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_rows(file, &path.display().to_string())
}
