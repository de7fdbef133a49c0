// Value cleaning applied to every stat row before it is persisted.
//
// Cells arrive as raw CSV text. Missing, blank, non-numeric and non-finite
// cells all clean to 0.0.

use hoopstats_core::db::StatLine;

use crate::dataset::RawStats;

/// Placeholder for a missing first or last name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Placeholder for a player the roster join could not place.
pub const UNKNOWN_POSITION: &str = "UNKNOWN";

/// A player name split for the players table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameParts<'a> {
    pub first: &'a str,
    pub last: &'a str,
    pub full: &'a str,
}

fn parse_finite(value: Option<&str>) -> Option<f64> {
    let text = value?.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a counting stat. Negative values clamp to 0.0 unless
/// `allow_negative` is set (plus-minus only).
pub fn clean_numeric(value: Option<&str>, allow_negative: bool) -> f64 {
    match parse_finite(value) {
        Some(v) if v < 0.0 && !allow_negative => 0.0,
        Some(v) => v,
        None => 0.0,
    }
}

/// Parse a shooting percentage and clamp it into `[0.0, 1.0]`.
pub fn clean_percentage(value: Option<&str>) -> f64 {
    parse_finite(value).map_or(0.0, |v| v.clamp(0.0, 1.0))
}

/// Split a full name on its first whitespace boundary.
///
/// `"LeBron James"` gives `("LeBron", "James")`, a single word keeps
/// `"Unknown"` as last name, and an empty name is `"Unknown"` throughout.
pub fn split_name(full_name: &str) -> NameParts<'_> {
    let full = full_name.trim();
    if full.is_empty() {
        return NameParts {
            first: UNKNOWN_NAME,
            last: UNKNOWN_NAME,
            full: UNKNOWN_NAME,
        };
    }

    match full.split_once(char::is_whitespace) {
        Some((first, rest)) => {
            let rest = rest.trim();
            NameParts {
                first,
                last: if rest.is_empty() { UNKNOWN_NAME } else { rest },
                full,
            }
        }
        None => NameParts {
            first: full,
            last: UNKNOWN_NAME,
            full,
        },
    }
}

/// Substitute `"UNKNOWN"` for a missing or blank position.
pub fn normalize_position(position: Option<&str>) -> &str {
    position
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(UNKNOWN_POSITION)
}

/// Apply the per-field cleaning rules to a raw stat row.
pub fn clean_stat_line(raw: &RawStats) -> StatLine {
    StatLine {
        games_played: clean_numeric(raw.gp.as_deref(), false),
        total_minutes: clean_numeric(raw.min.as_deref(), false),
        field_goal_percentage: clean_percentage(raw.fg_pct.as_deref()),
        three_point_percentage: clean_percentage(raw.fg3_pct.as_deref()),
        free_throw_percentage: clean_percentage(raw.ft_pct.as_deref()),
        total_rebounds: clean_numeric(raw.reb.as_deref(), false),
        assists: clean_numeric(raw.ast.as_deref(), false),
        turnovers: clean_numeric(raw.tov.as_deref(), false),
        steals: clean_numeric(raw.stl.as_deref(), false),
        blocks: clean_numeric(raw.blk.as_deref(), false),
        points: clean_numeric(raw.pts.as_deref(), false),
        fantasy_points_standard: clean_numeric(raw.nba_fantasy_pts.as_deref(), false),
        plus_minus: clean_numeric(raw.plus_minus.as_deref(), true),
    }
}
