//! PostgreSQL sink
//!
//! The loader is strictly sequential, so the async client is driven from a
//! current-thread runtime owned by the sink; every call blocks until the
//! database answers.

use super::schema::{self, postgres as sql};
use super::Sink;
use crate::config::DatabaseConfig;
use crate::error::SinkError;
use crate::types::{ArtistRecord, SongMatch, SongRecord, SongplayRecord, TimeRecord, UserRecord};
use tokio::runtime::Runtime;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

pub struct PostgresSink {
    runtime: Runtime,
    client: Client,
    in_transaction: bool,
}

impl PostgresSink {
    /// Connect using `host`, `dbname`, `user` and `password` from the config
    pub fn connect(config: &DatabaseConfig) -> Result<Self, SinkError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (client, connection) =
            runtime.block_on(tokio_postgres::connect(&config.connection_string(), NoTls))?;

        // Polled whenever the runtime is blocked on a query
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        tracing::info!("Connected to PostgreSQL at {}/{}", config.host, config.dbname);

        Ok(PostgresSink {
            runtime,
            client,
            in_transaction: false,
        })
    }

    pub fn create_tables(&mut self, reset: bool) -> Result<(), SinkError> {
        if reset {
            let drop_sql = schema::drop_tables_sql();
            self.runtime.block_on(self.client.batch_execute(&drop_sql))?;
        }
        self.runtime.block_on(self.client.batch_execute(sql::CREATE_TABLES))?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), SinkError> {
        if !self.in_transaction {
            self.runtime.block_on(self.client.batch_execute("BEGIN"))?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn execute(&mut self, statement: &str, params: &[Param<'_>]) -> Result<(), SinkError> {
        self.begin()?;
        self.runtime.block_on(self.client.execute(statement, params))?;
        Ok(())
    }
}

type Param<'a> = &'a (dyn ToSql + Sync);

fn song_params(song: &SongRecord) -> [Param<'_>; 5] {
    [&song.song_id, &song.title, &song.artist_id, &song.year, &song.duration]
}

fn artist_params(artist: &ArtistRecord) -> [Param<'_>; 5] {
    [
        &artist.artist_id,
        &artist.name,
        &artist.location,
        &artist.latitude,
        &artist.longitude,
    ]
}

/// hour, day, week, month and weekday as INT values; u32 would be sent as an OID
fn time_fields(time: &TimeRecord) -> [i32; 5] {
    [time.hour, time.day, time.week, time.month, time.weekday].map(|v| v as i32)
}

fn time_params<'a>(time: &'a TimeRecord, fields: &'a [i32; 5]) -> [Param<'a>; 7] {
    [
        &time.start_time,
        &fields[0],
        &fields[1],
        &fields[2],
        &fields[3],
        &time.year,
        &fields[4],
    ]
}

fn user_params(user: &UserRecord) -> [Param<'_>; 5] {
    [
        &user.user_id,
        &user.first_name,
        &user.last_name,
        &user.gender,
        &user.level,
    ]
}

fn songplay_params(songplay: &SongplayRecord) -> [Param<'_>; 8] {
    [
        &songplay.start_time,
        &songplay.user_id,
        &songplay.level,
        &songplay.song_id,
        &songplay.artist_id,
        &songplay.session_id,
        &songplay.location,
        &songplay.user_agent,
    ]
}

impl Sink for PostgresSink {
    fn insert_song(&mut self, song: &SongRecord) -> Result<(), SinkError> {
        self.execute(sql::SONG_INSERT, &song_params(song))
    }

    fn insert_artist(&mut self, artist: &ArtistRecord) -> Result<(), SinkError> {
        self.execute(sql::ARTIST_INSERT, &artist_params(artist))
    }

    fn insert_time(&mut self, time: &TimeRecord) -> Result<(), SinkError> {
        let fields = time_fields(time);
        self.execute(sql::TIME_INSERT, &time_params(time, &fields))
    }

    fn insert_user(&mut self, user: &UserRecord) -> Result<(), SinkError> {
        self.execute(sql::USER_INSERT, &user_params(user))
    }

    fn insert_songplay(&mut self, songplay: &SongplayRecord) -> Result<(), SinkError> {
        self.execute(sql::SONGPLAY_INSERT, &songplay_params(songplay))
    }

    fn find_song(
        &mut self,
        title: Option<&str>,
        artist: Option<&str>,
        length: Option<f64>,
    ) -> Result<Option<SongMatch>, SinkError> {
        let row = self
            .runtime
            .block_on(self.client.query_opt(sql::SONG_SELECT, &[&title, &artist, &length]))?;
        Ok(row.map(|row| SongMatch {
            song_id: row.get(0),
            artist_id: row.get(1),
        }))
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        if self.in_transaction {
            self.runtime.block_on(self.client.batch_execute("COMMIT"))?;
            self.in_transaction = false;
        }
        Ok(())
    }
}
