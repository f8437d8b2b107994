//! sparkify-etl: Load song metadata and event logs into the star schema
//!
//! Usage:
//!   # Load ./data/song_data and ./data/log_data into sparkify.db
//!   sparkify-etl
//!
//!   # Rebuild the tables from scratch, with UTC time rows
//!   sparkify-etl --reset --timezone utc --db /tmp/sparkify.db
//!
//!   # Load into PostgreSQL (requires the postgres-backend feature)
//!   sparkify-etl --backend postgres --create-tables --host 127.0.0.1 --dbname sparkifydb --user student
//!
//!   # Parse and transform everything without touching a database
//!   sparkify-etl --dry-run --song-data data/song_data --log-data data/log_data

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sparkify_etl::config::{Backend, EtlConfig, TimeZoneMode};
use sparkify_etl::{print_progress, run, sink, MemorySink, RunSummary};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TimeZoneArg {
    Local,
    Utc,
}

#[derive(Parser, Debug)]
#[command(name = "sparkify-etl")]
#[command(about = "Load song metadata and event logs into a star schema", long_about = None)]
struct Args {
    /// TOML configuration file; flags override its values
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root directory of the song metadata files
    #[arg(long, value_name = "DIR")]
    song_data: Option<PathBuf>,

    /// Root directory of the event log files
    #[arg(long, value_name = "DIR")]
    log_data: Option<PathBuf>,

    /// Regex matched against file names (default: "(?i)\.json$")
    #[arg(long)]
    pattern: Option<String>,

    /// Clock used for the time dimension
    #[arg(long, value_enum)]
    timezone: Option<TimeZoneArg>,

    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    dbname: Option<String>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long, env = "SPARKIFY_DB_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Create the star schema tables if they do not exist (always done for SQLite)
    #[arg(long)]
    create_tables: bool,

    /// Drop and recreate the star schema tables before loading
    #[arg(long)]
    reset: bool,

    /// Transform everything in memory without writing to a database
    #[arg(long, conflicts_with_all = ["create_tables", "reset"])]
    dry_run: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let dry_run = args.dry_run;
    let create_tables = args.create_tables || args.reset;
    let reset = args.reset;
    let config = build_config(args)?;

    let summary = if dry_run {
        info!("Dry run: rows are kept in memory only");
        let mut sink = MemorySink::new();
        run(&config, &mut sink, print_progress)?
    } else {
        let mut sink = sink::open(&config.database, create_tables, reset)
            .context("Failed to open database")?;
        run(&config, &mut sink, print_progress)?
    };

    print_summary(&summary);
    Ok(())
}

/// Merge the optional config file with command-line overrides
fn build_config(args: Args) -> Result<EtlConfig> {
    let mut config = match &args.config {
        Some(path) => EtlConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EtlConfig::default(),
    };

    if let Some(dir) = args.song_data {
        config.song_data = dir;
    }
    if let Some(dir) = args.log_data {
        config.log_data = dir;
    }
    if let Some(pattern) = args.pattern {
        config.file_pattern = pattern;
    }
    if let Some(tz) = args.timezone {
        config.timezone = match tz {
            TimeZoneArg::Local => TimeZoneMode::Local,
            TimeZoneArg::Utc => TimeZoneMode::Utc,
        };
    }
    if let Some(backend) = args.backend {
        config.database.backend = match backend {
            BackendArg::Sqlite => Backend::Sqlite,
            BackendArg::Postgres => Backend::Postgres,
        };
    }
    if let Some(path) = args.db {
        config.database.path = path;
    }
    if let Some(host) = args.host {
        config.database.host = host;
    }
    if let Some(dbname) = args.dbname {
        config.database.dbname = dbname;
    }
    if let Some(user) = args.user {
        config.database.user = user;
    }
    if let Some(password) = args.password {
        config.database.password = password;
    }

    Ok(config)
}

fn print_summary(summary: &RunSummary) {
    let mut total = summary.songs;
    total.merge(&summary.logs);

    info!("");
    info!("Load Summary");
    info!("============");
    info!("Song files: {}", summary.songs.files);
    info!("Log files: {} ({} events)", summary.logs.files, summary.logs.records);
    info!("songs rows: {}", total.songs);
    info!("artists rows: {}", total.artists);
    info!("time rows: {}", total.times);
    info!("users rows: {}", total.users);
    info!("songplays rows: {}", total.songplays);
    if total.unresolved > 0 {
        info!("Songplays without a matching song: {}", total.unresolved);
    }
}
