// Season-stat loader entry point.
//
// Startup sequence:
// 1. Load `.env` from the working directory, if present
// 2. Initialize tracing (console, stderr)
// 3. Load config (fails fast on missing connection settings)
// 4. Resolve the season plan and read the input CSV
// 5. Open the database and run the load in one transaction
// 6. Report commit or rollback and set the exit status

use std::process::ExitCode;

use anyhow::Context;
use hoopstats_core::config;
use hoopstats_core::db::Database;
use hoopstats_nba::dataset;
use hoopstats_nba::loader::{self, LoadOptions};
use hoopstats_nba::season::SeasonPlan;
use tracing::{error, info};

fn main() -> ExitCode {
    // 1. `.env` is optional; real environment variables win over it.
    let _ = dotenvy::dotenv();

    // 2. Initialize tracing
    if let Err(e) = init_tracing() {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("load failed: {e:#}");
            eprintln!("Error: {e:#}");
            if e.downcast_ref::<loader::LoadError>().is_some() {
                eprintln!("Transaction rolled back; no changes were written.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    match &config.source_file {
        Some(path) => info!("Config loaded from {}", path.display()),
        None => info!("No loader.toml found, using defaults"),
    }

    // 4. Season plan and input rows
    let plan = SeasonPlan::from_config(&config.season).context("invalid season configuration")?;
    let rows = dataset::load_stat_rows(&config.input_path)
        .with_context(|| format!("failed to read {}", config.input_path.display()))?;
    info!(
        "Read {} rows from {} for season {}",
        rows.len(),
        config.input_path.display(),
        plan.year
    );

    // 5. Database and load
    let mut db = Database::open(&config.db_path)?;
    println!(
        "Loading {} player rows for season {} into {}",
        rows.len(),
        plan.year,
        config.db_path
    );

    let options = LoadOptions {
        progress_every: config.progress_every,
    };
    let report = loader::load_season(&mut db, &plan, &rows, &options)?;

    // 6. Report
    println!("Transaction committed.");
    println!(
        "Load complete: {} rows, {} distinct players, {} new teams, season {} ({}).",
        report.rows,
        report.distinct_players,
        report.teams_created,
        plan.year,
        if report.season_created {
            "created"
        } else {
            "existing"
        }
    );
    Ok(())
}

/// Console subscriber on stderr so progress lines do not mix with the
/// banners on stdout.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoopstats=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
