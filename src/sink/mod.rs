//! Persistence sinks for the star schema
//!
//! Extractors never talk to a database directly; they receive a `Sink` handle and
//! issue one call per row. `commit` is called by the load driver once per file.

pub mod memory;
pub mod schema;
pub mod sqlite;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub use memory::{MemorySink, Tables};
pub use sqlite::SqliteSink;

#[cfg(feature = "postgres-backend")]
pub use postgres::PostgresSink;

use crate::config::{Backend, DatabaseConfig};
use crate::error::{EtlError, SinkError};
use crate::types::{ArtistRecord, SongMatch, SongRecord, SongplayRecord, TimeRecord, UserRecord};

/// Insert/select/commit operations over the five star-schema tables
pub trait Sink {
    fn insert_song(&mut self, song: &SongRecord) -> Result<(), SinkError>;

    fn insert_artist(&mut self, artist: &ArtistRecord) -> Result<(), SinkError>;

    fn insert_time(&mut self, time: &TimeRecord) -> Result<(), SinkError>;

    /// Upserts: a later row for the same user replaces `level`
    fn insert_user(&mut self, user: &UserRecord) -> Result<(), SinkError>;

    fn insert_songplay(&mut self, songplay: &SongplayRecord) -> Result<(), SinkError>;

    /// Find the song and artist keys for an exact (title, artist name, duration) match
    fn find_song(
        &mut self,
        title: Option<&str>,
        artist: Option<&str>,
        length: Option<f64>,
    ) -> Result<Option<SongMatch>, SinkError>;

    /// Make every write issued since the last commit durable
    fn commit(&mut self) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn insert_song(&mut self, song: &SongRecord) -> Result<(), SinkError> {
        (**self).insert_song(song)
    }

    fn insert_artist(&mut self, artist: &ArtistRecord) -> Result<(), SinkError> {
        (**self).insert_artist(artist)
    }

    fn insert_time(&mut self, time: &TimeRecord) -> Result<(), SinkError> {
        (**self).insert_time(time)
    }

    fn insert_user(&mut self, user: &UserRecord) -> Result<(), SinkError> {
        (**self).insert_user(user)
    }

    fn insert_songplay(&mut self, songplay: &SongplayRecord) -> Result<(), SinkError> {
        (**self).insert_songplay(songplay)
    }

    fn find_song(
        &mut self,
        title: Option<&str>,
        artist: Option<&str>,
        length: Option<f64>,
    ) -> Result<Option<SongMatch>, SinkError> {
        (**self).find_song(title, artist, length)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        (**self).commit()
    }
}

/// Open the sink selected by the database configuration
///
/// SQLite tables are always created if missing; PostgreSQL tables only when
/// `create_tables` is set. `reset` drops existing tables first.
#[cfg_attr(not(feature = "postgres-backend"), allow(unused_variables))]
pub fn open(config: &DatabaseConfig, create_tables: bool, reset: bool) -> Result<Box<dyn Sink>, EtlError> {
    match config.backend {
        Backend::Sqlite => {
            // A fresh database file always gets the schema
            let sink = SqliteSink::open(&config.path)?;
            sink.create_tables(reset)?;
            Ok(Box::new(sink))
        }
        #[cfg(feature = "postgres-backend")]
        Backend::Postgres => {
            let mut sink = PostgresSink::connect(config)?;
            if create_tables {
                sink.create_tables(reset)?;
            }
            Ok(Box::new(sink))
        }
        #[cfg(not(feature = "postgres-backend"))]
        Backend::Postgres => Err(EtlError::Config(
            "PostgreSQL support requires the `postgres-backend` feature".to_string(),
        )),
    }
}
