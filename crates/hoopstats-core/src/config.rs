// Configuration loading: optional loader.toml plus environment overrides.
//
// Connection settings come from the environment only and are required;
// everything else has a default that loader.toml or the environment can
// replace.

use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the SQLite database path (required).
pub const DB_PATH_VAR: &str = "HOOPSTATS_DB_PATH";
/// Environment variable overriding `input.path`.
pub const INPUT_VAR: &str = "HOOPSTATS_INPUT";
/// Environment variable overriding `season.year`.
pub const SEASON_VAR: &str = "HOOPSTATS_SEASON";
/// Environment variable naming an explicit config file.
pub const CONFIG_VAR: &str = "HOOPSTATS_CONFIG";

const CONFIG_FILE_NAME: &str = "loader.toml";
const DEFAULT_SEASON: &str = "2024-25";
const DEFAULT_INPUT: &str = "nba_fantasy_stats_with_positions.csv";
/// Default number of rows between progress lines.
pub const DEFAULT_PROGRESS_EVERY: usize = 50;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable `{name}` is not set")]
    MissingEnvVar { name: String },

    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub input_path: PathBuf,
    pub season: SeasonConfig,
    /// Emit a progress line every this many rows.
    pub progress_every: usize,
    /// The config file that was read, if any.
    pub source_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonConfig {
    pub year: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// loader.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoaderFile {
    season: SeasonSection,
    input: InputSection,
    progress: ProgressSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SeasonSection {
    year: String,
    start_date: Option<String>,
    end_date: Option<String>,
}

impl Default for SeasonSection {
    fn default() -> Self {
        Self {
            year: DEFAULT_SEASON.to_string(),
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct InputSection {
    path: String,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            path: DEFAULT_INPUT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ProgressSection {
    every: usize,
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load configuration using `search_dirs` for `loader.toml` and `env` as the
/// environment lookup.
///
/// `$HOOPSTATS_CONFIG` wins over the search directories and must exist when
/// set. Otherwise the first directory containing `loader.toml` is used, and
/// defaults apply when none does. Environment overrides are applied last.
pub fn load_config_from<F>(search_dirs: &[PathBuf], env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    // Connection settings are checked before anything touches the disk.
    let db_path = lookup(DB_PATH_VAR).ok_or_else(|| ConfigError::MissingEnvVar {
        name: DB_PATH_VAR.to_string(),
    })?;

    let source_file = locate_config_file(search_dirs, lookup(CONFIG_VAR))?;
    let file = match &source_file {
        Some(path) => {
            let text = read_file(path)?;
            toml::from_str::<LoaderFile>(&text).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?
        }
        None => LoaderFile::default(),
    };

    let year = lookup(SEASON_VAR).unwrap_or(file.season.year);
    let input = lookup(INPUT_VAR).unwrap_or(file.input.path);

    let config = Config {
        db_path,
        input_path: PathBuf::from(input.trim()),
        season: SeasonConfig {
            year: year.trim().to_string(),
            start_date: parse_date("season.start_date", file.season.start_date.as_deref())?,
            end_date: parse_date("season.end_date", file.season.end_date.as_deref())?,
        },
        progress_every: file.progress.every,
        source_file,
    };

    validate(&config)?;

    Ok(config)
}

/// Convenience wrapper: searches `./config/` and the platform config
/// directory, reading the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let search_dirs = default_search_dirs(std::env::current_dir().ok());
    load_config_from(&search_dirs, |name| std::env::var(name).ok())
}

/// `<cwd>/config` followed by the platform config directory. An unknown
/// working directory only drops the first entry.
fn default_search_dirs(cwd: Option<PathBuf>) -> Vec<PathBuf> {
    let mut search_dirs: Vec<PathBuf> = cwd.into_iter().map(|dir| dir.join("config")).collect();
    if let Some(dirs) = ProjectDirs::from("", "", "hoopstats") {
        search_dirs.push(dirs.config_dir().to_path_buf());
    }
    search_dirs
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn locate_config_file(
    search_dirs: &[PathBuf],
    explicit: Option<String>,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(explicit) = explicit {
        let path = PathBuf::from(explicit.trim());
        if !path.is_file() {
            return Err(ConfigError::FileNotFound { path });
        }
        return Ok(Some(path));
    }

    Ok(search_dirs
        .iter()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file()))
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ConfigError> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
            ConfigError::ValidationError {
                field: field.to_string(),
                message: format!("expected YYYY-MM-DD, got {s:?} ({e})"),
            }
        })
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.season.year.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "season.year".into(),
            message: "must not be empty".into(),
        });
    }

    if config.input_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "input.path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.progress_every == 0 {
        return Err(ConfigError::ValidationError {
            field: "progress.every".into(),
            message: "must be > 0".into(),
        });
    }

    if let (Some(start), Some(end)) = (config.season.start_date, config.season.end_date) {
        if start >= end {
            return Err(ConfigError::ValidationError {
                field: "season.end_date".into(),
                message: format!("must be after start_date {start}, got {end}"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    /// Helper: a fresh scratch directory with an empty `config/` inside.
    fn scratch_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("hoopstats_{name}"));
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    /// Helper: an environment lookup backed by a fixed map.
    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_db_path_fails_fast() {
        let tmp = scratch_dir("missing_db_path");
        let err = load_config_from(&[tmp.join("config")], env_of(&[])).unwrap_err();
        match &err {
            ConfigError::MissingEnvVar { name } => assert_eq!(name, DB_PATH_VAR),
            other => panic!("expected MissingEnvVar, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn blank_db_path_counts_as_unset() {
        let tmp = scratch_dir("blank_db_path");
        let err = load_config_from(&[tmp.join("config")], env_of(&[(DB_PATH_VAR, "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn defaults_apply_without_config_file() {
        let tmp = scratch_dir("defaults");
        let config =
            load_config_from(&[tmp.join("config")], env_of(&[(DB_PATH_VAR, "stats.db")]))
                .expect("defaults should load");

        assert_eq!(config.db_path, "stats.db");
        assert_eq!(config.season.year, "2024-25");
        assert_eq!(config.season.start_date, None);
        assert_eq!(config.season.end_date, None);
        assert_eq!(
            config.input_path,
            PathBuf::from("nba_fantasy_stats_with_positions.csv")
        );
        assert_eq!(config.progress_every, 50);
        assert!(config.source_file.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn reads_loader_toml_sections() {
        let tmp = scratch_dir("reads_sections");
        fs::write(
            tmp.join("config/loader.toml"),
            r#"
[season]
year = "2023-24"
start_date = "2023-10-24"
end_date = "2024-06-17"

[input]
path = "data/stats.csv"

[progress]
every = 25
"#,
        )
        .unwrap();

        let config =
            load_config_from(&[tmp.join("config")], env_of(&[(DB_PATH_VAR, "stats.db")]))
                .expect("should load loader.toml");

        assert_eq!(config.season.year, "2023-24");
        assert_eq!(
            config.season.start_date,
            NaiveDate::from_ymd_opt(2023, 10, 24)
        );
        assert_eq!(config.season.end_date, NaiveDate::from_ymd_opt(2024, 6, 17));
        assert_eq!(config.input_path, PathBuf::from("data/stats.csv"));
        assert_eq!(config.progress_every, 25);
        assert_eq!(config.source_file, Some(tmp.join("config/loader.toml")));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = scratch_dir("partial_file");
        fs::write(tmp.join("config/loader.toml"), "[progress]\nevery = 10\n").unwrap();

        let config =
            load_config_from(&[tmp.join("config")], env_of(&[(DB_PATH_VAR, "stats.db")]))
                .unwrap();
        assert_eq!(config.progress_every, 10);
        assert_eq!(config.season.year, "2024-25");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn environment_overrides_file_values() {
        let tmp = scratch_dir("env_overrides");
        fs::write(
            tmp.join("config/loader.toml"),
            "[season]\nyear = \"2022-23\"\n\n[input]\npath = \"from_file.csv\"\n",
        )
        .unwrap();

        let config = load_config_from(
            &[tmp.join("config")],
            env_of(&[
                (DB_PATH_VAR, "stats.db"),
                (SEASON_VAR, "2025-26"),
                (INPUT_VAR, "from_env.csv"),
            ]),
        )
        .unwrap();

        assert_eq!(config.season.year, "2025-26");
        assert_eq!(config.input_path, PathBuf::from("from_env.csv"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn first_search_dir_with_file_wins() {
        let first = scratch_dir("search_first");
        let second = scratch_dir("search_second");
        fs::write(second.join("config/loader.toml"), "[progress]\nevery = 7\n").unwrap();

        let config = load_config_from(
            &[first.join("config"), second.join("config")],
            env_of(&[(DB_PATH_VAR, "stats.db")]),
        )
        .unwrap();
        assert_eq!(config.progress_every, 7);

        let _ = fs::remove_dir_all(&first);
        let _ = fs::remove_dir_all(&second);
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let tmp = scratch_dir("explicit_missing");
        let missing = tmp.join("nope.toml");
        let err = load_config_from(
            &[tmp.join("config")],
            env_of(&[
                (DB_PATH_VAR, "stats.db"),
                (CONFIG_VAR, missing.to_str().unwrap()),
            ]),
        )
        .unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("nope.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = scratch_dir("invalid_toml");
        fs::write(tmp.join("config/loader.toml"), "this is not valid [[[ toml").unwrap();

        let err = load_config_from(&[tmp.join("config")], env_of(&[(DB_PATH_VAR, "stats.db")]))
            .unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("loader.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn search_dirs_start_with_working_directory() {
        let cwd = PathBuf::from("/srv/loader");
        let dirs = default_search_dirs(Some(cwd.clone()));
        assert_eq!(dirs.first(), Some(&cwd.join("config")));
    }

    #[test]
    fn unknown_working_directory_only_drops_local_config() {
        let with_cwd = default_search_dirs(Some(PathBuf::from("/srv/loader")));
        let without_cwd = default_search_dirs(None);
        assert_eq!(without_cwd.as_slice(), &with_cwd[1..]);
    }

    #[test]
    fn rejects_zero_progress_interval() {
        let tmp = scratch_dir("zero_progress");
        fs::write(tmp.join("config/loader.toml"), "[progress]\nevery = 0\n").unwrap();

        let err = load_config_from(&[tmp.join("config")], env_of(&[(DB_PATH_VAR, "stats.db")]))
            .unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "progress.every"),
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_malformed_start_date() {
        let tmp = scratch_dir("bad_start_date");
        fs::write(
            tmp.join("config/loader.toml"),
            "[season]\nstart_date = \"October 1st\"\n",
        )
        .unwrap();

        let err = load_config_from(&[tmp.join("config")], env_of(&[(DB_PATH_VAR, "stats.db")]))
            .unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "season.start_date"),
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_end_date_before_start_date() {
        let tmp = scratch_dir("dates_reversed");
        fs::write(
            tmp.join("config/loader.toml"),
            "[season]\nstart_date = \"2025-06-30\"\nend_date = \"2024-10-01\"\n",
        )
        .unwrap();

        let err = load_config_from(&[tmp.join("config")], env_of(&[(DB_PATH_VAR, "stats.db")]))
            .unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "season.end_date"),
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }
}
