use super::schema::{self, sqlite as sql};
use super::Sink;
use crate::error::SinkError;
use crate::types::{ArtistRecord, SongMatch, SongRecord, SongplayRecord, TimeRecord, UserRecord};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Star schema stored in a SQLite database
///
/// A transaction is opened on the first write after a commit, so every write made
/// while processing one file lands in the same transaction.
pub struct SqliteSink {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteSink {
    /// Open or create a database file
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        let conn = Connection::open(path)?;
        Ok(Self::with_connection(conn))
    }

    /// Open an in-memory database with the schema already created
    pub fn in_memory() -> Result<Self, SinkError> {
        let sink = Self::with_connection(Connection::open_in_memory()?);
        sink.create_tables(false)?;
        Ok(sink)
    }

    fn with_connection(conn: Connection) -> Self {
        SqliteSink {
            conn,
            in_transaction: false,
        }
    }

    /// Create the star schema, dropping existing tables first if `reset` is set
    pub fn create_tables(&self, reset: bool) -> Result<(), SinkError> {
        if reset {
            self.conn.execute_batch(&schema::drop_tables_sql())?;
        }
        self.conn.execute_batch(sql::CREATE_TABLES)?;
        Ok(())
    }

    /// Row count of one of the star-schema tables
    pub fn count(&self, table: &str) -> Result<i64, SinkError> {
        if !schema::TABLES.contains(&table) {
            return Err(SinkError::Constraint {
                table: "schema",
                message: format!("unknown table {}", table),
            });
        }
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Subscription level currently stored for a user
    pub fn user_level(&self, user_id: i64) -> Result<Option<String>, SinkError> {
        let level = self
            .conn
            .query_row(
                "SELECT level FROM users WHERE user_id = ?1",
                [user_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(level.flatten())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn begin(&mut self) -> Result<(), SinkError> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl Sink for SqliteSink {
    fn insert_song(&mut self, song: &SongRecord) -> Result<(), SinkError> {
        self.begin()?;
        self.conn.execute(
            sql::SONG_INSERT,
            params![song.song_id, song.title, song.artist_id, song.year, song.duration],
        )?;
        Ok(())
    }

    fn insert_artist(&mut self, artist: &ArtistRecord) -> Result<(), SinkError> {
        self.begin()?;
        self.conn.execute(
            sql::ARTIST_INSERT,
            params![
                artist.artist_id,
                artist.name,
                artist.location,
                artist.latitude,
                artist.longitude
            ],
        )?;
        Ok(())
    }

    fn insert_time(&mut self, time: &TimeRecord) -> Result<(), SinkError> {
        self.begin()?;
        self.conn.execute(
            sql::TIME_INSERT,
            params![
                time.start_time,
                time.hour,
                time.day,
                time.week,
                time.month,
                time.year,
                time.weekday
            ],
        )?;
        Ok(())
    }

    fn insert_user(&mut self, user: &UserRecord) -> Result<(), SinkError> {
        self.begin()?;
        self.conn.execute(
            sql::USER_INSERT,
            params![
                user.user_id,
                user.first_name,
                user.last_name,
                user.gender,
                user.level
            ],
        )?;
        Ok(())
    }

    fn insert_songplay(&mut self, songplay: &SongplayRecord) -> Result<(), SinkError> {
        self.begin()?;
        self.conn.execute(
            sql::SONGPLAY_INSERT,
            params![
                songplay.start_time,
                songplay.user_id,
                songplay.level,
                songplay.song_id,
                songplay.artist_id,
                songplay.session_id,
                songplay.location,
                songplay.user_agent
            ],
        )?;
        Ok(())
    }

    fn find_song(
        &mut self,
        title: Option<&str>,
        artist: Option<&str>,
        length: Option<f64>,
    ) -> Result<Option<SongMatch>, SinkError> {
        let found = self
            .conn
            .query_row(sql::SONG_SELECT, params![title, artist, length], |row| {
                Ok(SongMatch {
                    song_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            })
            .optional()?;
        Ok(found)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }
        Ok(())
    }
}
