//! # Sparkify ETL - JSON to Star Schema Loader
//!
//! Loads song metadata and application event logs (newline-delimited JSON) into a
//! relational star schema: `songs`, `artists`, `users` and `time` dimensions plus
//! the `songplays` fact table.
//!
//! ## Modules
//!
//! - **parser**: decode JSON-lines files into typed records
//! - **extract**: map song and log records to dimension and fact rows
//! - **load**: discover data files and commit them one at a time
//! - **sink**: SQLite, PostgreSQL and in-memory persistence
//!
//! ## Quick Start
//!
//! ```rust
//! use sparkify_etl::{run, EtlConfig, MemorySink};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let config = EtlConfig {
//!     song_data: dir.path().join("song_data"),
//!     log_data: dir.path().join("log_data"),
//!     ..EtlConfig::default()
//! };
//!
//! let mut sink = MemorySink::new();
//! let summary = run(&config, &mut sink, |_| {})?;
//!
//! // Nothing to load in empty directories
//! assert_eq!(summary.songs.files, 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod parser;
pub mod sink;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{Backend, DatabaseConfig, EtlConfig, TimeZoneMode};
pub use error::{EtlError, SinkError};
pub use extract::{derive_time, process_log_file, process_song_file};
pub use load::{find_files, find_json_files, print_progress, process_data, Progress};
pub use sink::{MemorySink, Sink, SqliteSink};
pub use types::{
    ArtistRecord, FileStats, LogEvent, SongMatch, SongMetadata, SongRecord, SongplayRecord, TimeRecord, UserRecord,
};

/// Totals for the two passes of a load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub songs: FileStats,
    pub logs: FileStats,
}

/// Main entry point: load every song file, then every log file
///
/// Songs go first so that songplays can resolve their song and artist keys.
pub fn run<S, P>(config: &EtlConfig, sink: &mut S, mut progress: P) -> Result<RunSummary, EtlError>
where
    S: Sink + ?Sized,
    P: FnMut(Progress<'_>),
{
    let pattern = load::file_pattern(&config.file_pattern)?;

    tracing::info!("Loading song data from {}", config.song_data.display());
    let song_files = load::find_files(&config.song_data, &pattern)?;
    let songs = process_data(
        sink,
        &config.song_data,
        &song_files,
        |sink: &mut S, path: &std::path::Path| process_song_file(sink, path),
        &mut progress,
    )?;

    tracing::info!("Loading log data from {}", config.log_data.display());
    let log_files = load::find_files(&config.log_data, &pattern)?;
    let tz = config.timezone;
    let logs = process_data(
        sink,
        &config.log_data,
        &log_files,
        |sink: &mut S, path: &std::path::Path| process_log_file(sink, path, tz),
        &mut progress,
    )?;

    Ok(RunSummary { songs, logs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_fails_before_loading() {
        let config = EtlConfig {
            file_pattern: "[".to_string(),
            ..EtlConfig::default()
        };
        let mut sink = MemorySink::new();
        let result = run(&config, &mut sink, |_| {});
        assert!(matches!(result, Err(EtlError::Config(_))));
    }
}
