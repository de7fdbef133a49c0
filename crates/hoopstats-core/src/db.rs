// SQLite persistence layer for seasons, teams, players and season stats.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

/// Per-season numeric stat line, already cleaned and ready to persist.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatLine {
    pub games_played: f64,
    pub total_minutes: f64,
    pub field_goal_percentage: f64,
    pub three_point_percentage: f64,
    pub free_throw_percentage: f64,
    pub total_rebounds: f64,
    pub assists: f64,
    pub turnovers: f64,
    pub steals: f64,
    pub blocks: f64,
    pub points: f64,
    pub fantasy_points_standard: f64,
    pub plus_minus: f64,
}

/// A season to create when its year is not stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeason<'a> {
    pub season_year: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

/// Player identity keyed by the external (stats provider) id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayer<'a> {
    pub player_id: i64,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub full_name: &'a str,
    pub position: &'a str,
    pub team_id: i64,
}

/// Stat row keyed by `(player_id, season_id)`. `player_id` is the internal
/// players.id, not the external one.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayerSeasonStat {
    pub player_id: i64,
    pub season_id: i64,
    pub team_id: i64,
    pub stats: StatLine,
}

/// Outcome of a get-or-create: the row id and whether this call inserted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub id: i64,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Season {
    pub id: i64,
    pub season_year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: i64,
    pub player_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub position: String,
    pub team_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeasonStat {
    pub player_id: i64,
    pub season_id: i64,
    pub team_id: i64,
    pub stats: StatLine,
    pub updated_at: String,
}

/// Tables owned by this schema, for row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Seasons,
    Teams,
    Players,
    PlayerSeasonStats,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Seasons => "seasons",
            Table::Teams => "teams",
            Table::Players => "players",
            Table::PlayerSeasonStats => "player_season_stats",
        }
    }
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS seasons (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        season_year TEXT NOT NULL UNIQUE,
        start_date  TEXT NOT NULL,
        end_date    TEXT NOT NULL,
        is_current  INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS teams (
        id   INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS players (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        player_id  INTEGER NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name  TEXT NOT NULL,
        full_name  TEXT NOT NULL,
        position   TEXT NOT NULL,
        team_id    INTEGER NOT NULL REFERENCES teams(id)
    );

    CREATE TABLE IF NOT EXISTS player_season_stats (
        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
        player_id               INTEGER NOT NULL REFERENCES players(id),
        season_id               INTEGER NOT NULL REFERENCES seasons(id),
        team_id                 INTEGER NOT NULL REFERENCES teams(id),
        games_played            REAL NOT NULL CHECK (games_played >= 0),
        total_minutes           REAL NOT NULL CHECK (total_minutes >= 0),
        field_goal_percentage   REAL NOT NULL CHECK (field_goal_percentage BETWEEN 0 AND 1),
        three_point_percentage  REAL NOT NULL CHECK (three_point_percentage BETWEEN 0 AND 1),
        free_throw_percentage   REAL NOT NULL CHECK (free_throw_percentage BETWEEN 0 AND 1),
        total_rebounds          REAL NOT NULL CHECK (total_rebounds >= 0),
        assists                 REAL NOT NULL CHECK (assists >= 0),
        turnovers               REAL NOT NULL CHECK (turnovers >= 0),
        steals                  REAL NOT NULL CHECK (steals >= 0),
        blocks                  REAL NOT NULL CHECK (blocks >= 0),
        points                  REAL NOT NULL CHECK (points >= 0),
        fantasy_points_standard REAL NOT NULL CHECK (fantasy_points_standard >= 0),
        plus_minus              REAL NOT NULL,
        updated_at              TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        UNIQUE (player_id, season_id)
    );
";

/// SQLite-backed store for the loader's four tables.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(SCHEMA)
            .context("failed to create database schema")?;

        debug!(path, "database ready");
        Ok(Self { conn })
    }

    /// Borrow the underlying connection for ad-hoc queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin the single write transaction a load runs in. Dropping the
    /// returned guard without calling [`StatsTransaction::commit`] rolls
    /// everything back.
    pub fn transaction(&mut self) -> rusqlite::Result<StatsTransaction<'_>> {
        let tx = self.conn.transaction()?;
        Ok(StatsTransaction { tx })
    }

    /// Number of rows currently stored in `table`.
    pub fn count(&self, table: Table) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("failed to count rows in {}", table.name()))?;
        Ok(count as usize)
    }

    pub fn season(&self, season_year: &str) -> Result<Option<Season>> {
        self.conn
            .query_row(
                "SELECT id, season_year, start_date, end_date, is_current
                 FROM seasons WHERE season_year = ?1",
                params![season_year],
                |row| {
                    Ok(Season {
                        id: row.get(0)?,
                        season_year: row.get(1)?,
                        start_date: row.get(2)?,
                        end_date: row.get(3)?,
                        is_current: row.get(4)?,
                    })
                },
            )
            .optional()
            .context("failed to query season")
    }

    pub fn team(&self, name: &str) -> Result<Option<Team>> {
        self.conn
            .query_row(
                "SELECT id, name FROM teams WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Team {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .context("failed to query team")
    }

    /// Look up a player by external id.
    pub fn player(&self, player_id: i64) -> Result<Option<Player>> {
        self.conn
            .query_row(
                "SELECT id, player_id, first_name, last_name, full_name, position, team_id
                 FROM players WHERE player_id = ?1",
                params![player_id],
                |row| {
                    Ok(Player {
                        id: row.get(0)?,
                        player_id: row.get(1)?,
                        first_name: row.get(2)?,
                        last_name: row.get(3)?,
                        full_name: row.get(4)?,
                        position: row.get(5)?,
                        team_id: row.get(6)?,
                    })
                },
            )
            .optional()
            .context("failed to query player")
    }

    /// Look up the stat row for an external player id in a season year.
    pub fn player_season_stat(
        &self,
        player_id: i64,
        season_year: &str,
    ) -> Result<Option<PlayerSeasonStat>> {
        self.conn
            .query_row(
                "SELECT s.player_id, s.season_id, s.team_id,
                        s.games_played, s.total_minutes, s.field_goal_percentage,
                        s.three_point_percentage, s.free_throw_percentage,
                        s.total_rebounds, s.assists, s.turnovers, s.steals, s.blocks,
                        s.points, s.fantasy_points_standard, s.plus_minus, s.updated_at
                 FROM player_season_stats s
                 JOIN players p ON p.id = s.player_id
                 JOIN seasons se ON se.id = s.season_id
                 WHERE p.player_id = ?1 AND se.season_year = ?2",
                params![player_id, season_year],
                |row| {
                    Ok(PlayerSeasonStat {
                        player_id: row.get(0)?,
                        season_id: row.get(1)?,
                        team_id: row.get(2)?,
                        stats: StatLine {
                            games_played: row.get(3)?,
                            total_minutes: row.get(4)?,
                            field_goal_percentage: row.get(5)?,
                            three_point_percentage: row.get(6)?,
                            free_throw_percentage: row.get(7)?,
                            total_rebounds: row.get(8)?,
                            assists: row.get(9)?,
                            turnovers: row.get(10)?,
                            steals: row.get(11)?,
                            blocks: row.get(12)?,
                            points: row.get(13)?,
                            fantasy_points_standard: row.get(14)?,
                            plus_minus: row.get(15)?,
                        },
                        updated_at: row.get(16)?,
                    })
                },
            )
            .optional()
            .context("failed to query player season stat")
    }
}

/// Write side of a load. Every statement runs inside one transaction.
pub struct StatsTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl StatsTransaction<'_> {
    /// Return the id of `season.season_year`, inserting the season when it
    /// is not stored yet.
    pub fn get_or_create_season(&self, season: &NewSeason<'_>) -> rusqlite::Result<Resolved> {
        let existing: Option<i64> = self
            .tx
            .prepare_cached("SELECT id FROM seasons WHERE season_year = ?1")?
            .query_row(params![season.season_year], |row| row.get(0))
            .optional()?;
        if let Some(id) = existing {
            return Ok(Resolved { id, created: false });
        }

        let id: i64 = self
            .tx
            .prepare_cached(
                "INSERT INTO seasons (season_year, start_date, end_date, is_current)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
            )?
            .query_row(
                params![
                    season.season_year,
                    season.start_date,
                    season.end_date,
                    season.is_current
                ],
                |row| row.get(0),
            )?;
        Ok(Resolved { id, created: true })
    }

    /// Atomic get-or-create by abbreviation. The insert is absorbed by the
    /// UNIQUE constraint on `name` when the team already exists, in which
    /// case the stored id is read back.
    pub fn get_or_create_team(&self, name: &str) -> rusqlite::Result<Resolved> {
        let inserted: Option<i64> = self
            .tx
            .prepare_cached(
                "INSERT INTO teams (name) VALUES (?1)
                 ON CONFLICT(name) DO NOTHING
                 RETURNING id",
            )?
            .query_row(params![name], |row| row.get(0))
            .optional()?;
        if let Some(id) = inserted {
            return Ok(Resolved { id, created: true });
        }

        let id: i64 = self
            .tx
            .prepare_cached("SELECT id FROM teams WHERE name = ?1")?
            .query_row(params![name], |row| row.get(0))?;
        Ok(Resolved { id, created: false })
    }

    /// Insert a player or overwrite every descriptive field and the team of
    /// the row with the same external id. Returns the internal id.
    pub fn upsert_player(&self, player: &NewPlayer<'_>) -> rusqlite::Result<i64> {
        self.tx
            .prepare_cached(
                "INSERT INTO players (player_id, first_name, last_name, full_name, position, team_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(player_id) DO UPDATE SET
                    first_name = excluded.first_name,
                    last_name  = excluded.last_name,
                    full_name  = excluded.full_name,
                    position   = excluded.position,
                    team_id    = excluded.team_id
                 RETURNING id",
            )?
            .query_row(
                params![
                    player.player_id,
                    player.first_name,
                    player.last_name,
                    player.full_name,
                    player.position,
                    player.team_id
                ],
                |row| row.get(0),
            )
    }

    /// Insert a stat row or overwrite every numeric field, the team and
    /// `updated_at` of the row with the same `(player_id, season_id)`.
    pub fn upsert_player_season_stat(&self, stat: &NewPlayerSeasonStat) -> rusqlite::Result<()> {
        let s = &stat.stats;
        self.tx
            .prepare_cached(
                "INSERT INTO player_season_stats (
                    player_id, season_id, team_id, games_played, total_minutes,
                    field_goal_percentage, three_point_percentage, free_throw_percentage,
                    total_rebounds, assists, turnovers, steals, blocks, points,
                    fantasy_points_standard, plus_minus
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                 ON CONFLICT(player_id, season_id) DO UPDATE SET
                    team_id                 = excluded.team_id,
                    games_played            = excluded.games_played,
                    total_minutes           = excluded.total_minutes,
                    field_goal_percentage   = excluded.field_goal_percentage,
                    three_point_percentage  = excluded.three_point_percentage,
                    free_throw_percentage   = excluded.free_throw_percentage,
                    total_rebounds          = excluded.total_rebounds,
                    assists                 = excluded.assists,
                    turnovers               = excluded.turnovers,
                    steals                  = excluded.steals,
                    blocks                  = excluded.blocks,
                    points                  = excluded.points,
                    fantasy_points_standard = excluded.fantasy_points_standard,
                    plus_minus              = excluded.plus_minus,
                    updated_at              = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            )?
            .execute(params![
                stat.player_id,
                stat.season_id,
                stat.team_id,
                s.games_played,
                s.total_minutes,
                s.field_goal_percentage,
                s.three_point_percentage,
                s.free_throw_percentage,
                s.total_rebounds,
                s.assists,
                s.turnovers,
                s.steals,
                s.blocks,
                s.points,
                s.fantasy_points_standard,
                s.plus_minus,
            ])?;
        Ok(())
    }

    /// Commit everything written through this transaction.
    pub fn commit(self) -> rusqlite::Result<()> {
        self.tx.commit()
    }
}
