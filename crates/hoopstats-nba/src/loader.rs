// Season-stat loader.
//
// Resolves the target season once, then for every input row, in order:
// get-or-create the team, upsert the player, clean the stat cells and
// upsert the season stat line. The whole run is one transaction: it commits
// after the last row and rolls back entirely on the first failure.

use std::collections::HashSet;

use hoopstats_core::config::DEFAULT_PROGRESS_EVERY;
use hoopstats_core::db::{Database, NewPlayer, NewPlayerSeasonStat, StatLine, StatsTransaction};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::clean::{clean_stat_line, normalize_position, split_name};
use crate::dataset::StatRow;
use crate::season::SeasonPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Log a progress line every this many rows; 0 disables progress lines.
    pub progress_every: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// Summary of a committed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub season_id: i64,
    pub season_created: bool,
    pub rows: usize,
    pub teams_created: usize,
    pub distinct_players: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to begin load transaction: {0}")]
    Begin(#[source] rusqlite::Error),

    #[error("failed to resolve season {season}: {source}")]
    Season {
        season: String,
        source: rusqlite::Error,
    },

    #[error("failed to resolve team {team:?} (row {index}): {source}")]
    Team {
        index: usize,
        team: String,
        source: rusqlite::Error,
    },

    #[error("failed to upsert player {player_name:?} (row {index}): {source}")]
    Player {
        index: usize,
        player_name: String,
        source: rusqlite::Error,
    },

    #[error("failed to insert stats for {player_name:?} (row {index}): {source}")]
    Row {
        index: usize,
        player_name: String,
        values: StatLine,
        source: rusqlite::Error,
    },

    #[error("failed to commit load: {0}")]
    Commit(#[source] rusqlite::Error),
}

/// Load `rows` for `season` into `db`.
///
/// Running the same rows twice leaves the database as the first run left
/// it, apart from `updated_at` on the stat rows. Any error rolls back every
/// write made by this call.
pub fn load_season(
    db: &mut Database,
    season: &SeasonPlan,
    rows: &[StatRow],
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    let tx = db.transaction().map_err(LoadError::Begin)?;

    match load_rows(&tx, season, rows, options) {
        Ok(report) => {
            tx.commit().map_err(LoadError::Commit)?;
            info!(
                season = %season.year,
                rows = report.rows,
                teams_created = report.teams_created,
                "load committed"
            );
            Ok(report)
        }
        Err(e) => {
            drop(tx);
            warn!(season = %season.year, "load failed, transaction rolled back");
            Err(e)
        }
    }
}

fn load_rows(
    tx: &StatsTransaction<'_>,
    season: &SeasonPlan,
    rows: &[StatRow],
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    let resolved = tx
        .get_or_create_season(&season.as_new_season())
        .map_err(|source| LoadError::Season {
            season: season.year.to_string(),
            source,
        })?;
    if resolved.created {
        info!(season = %season.year, id = resolved.id, "season not found, inserted it");
    }
    let season_id = resolved.id;

    info!(season = %season.year, "processing {} players...", rows.len());

    let mut teams_created = 0;
    let mut players = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        let team = tx
            .get_or_create_team(&row.team_abbreviation)
            .map_err(|source| LoadError::Team {
                index,
                team: row.team_abbreviation.clone(),
                source,
            })?;
        if team.created {
            teams_created += 1;
        }

        let name = split_name(&row.player_name);
        let player_id = tx
            .upsert_player(&NewPlayer {
                player_id: row.player_id,
                first_name: name.first,
                last_name: name.last,
                full_name: name.full,
                position: normalize_position(row.position.as_deref()),
                team_id: team.id,
            })
            .map_err(|source| LoadError::Player {
                index,
                player_name: row.player_name.clone(),
                source,
            })?;
        players.insert(row.player_id);

        let values = clean_stat_line(&row.stats);
        if index == 0 {
            info!(?values, "sample stats data");
        }

        let stat = NewPlayerSeasonStat {
            player_id,
            season_id,
            team_id: team.id,
            stats: values,
        };
        if let Err(source) = tx.upsert_player_season_stat(&stat) {
            error!(
                index,
                player = %row.player_name,
                ?values,
                error = %source,
                "error inserting player stats"
            );
            return Err(LoadError::Row {
                index,
                player_name: row.player_name.clone(),
                values,
                source,
            });
        }

        let processed = index + 1;
        if options.progress_every > 0 && processed % options.progress_every == 0 {
            info!("processed {processed} players...");
        }
    }

    Ok(LoadReport {
        season_id,
        season_created: resolved.created,
        rows: rows.len(),
        teams_created,
        distinct_players: players.len(),
    })
}
