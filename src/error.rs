use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading data files
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON, or a record missing a required field
    #[error("Failed to parse {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("No records found in {0}")]
    EmptyFile(PathBuf),

    #[error("Invalid timestamp in {path} at line {line}: {ts:?}")]
    Timestamp {
        path: PathBuf,
        line: usize,
        ts: Option<i64>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Errors raised by the persistence layer
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres-backend")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Constraint violated on {table}: {message}")]
    Constraint {
        table: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
