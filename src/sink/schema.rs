//! Star schema DDL and statement text
//!
//! SQLite and PostgreSQL differ in placeholder syntax and in how the songplay
//! surrogate key is generated, so each backend has its own set.

/// Tables in drop order (fact first)
pub const TABLES: [&str; 5] = ["songplays", "users", "songs", "artists", "time"];

pub mod sqlite {
    pub const CREATE_TABLES: &str = "
        CREATE TABLE IF NOT EXISTS songplays (
            songplay_id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_time TIMESTAMP NOT NULL,
            user_id BIGINT,
            level TEXT,
            song_id TEXT,
            artist_id TEXT,
            session_id BIGINT,
            location TEXT,
            user_agent TEXT
        );
        CREATE TABLE IF NOT EXISTS users (
            user_id BIGINT NOT NULL PRIMARY KEY,
            first_name TEXT,
            last_name TEXT,
            gender TEXT,
            level TEXT
        );
        CREATE TABLE IF NOT EXISTS songs (
            song_id TEXT NOT NULL PRIMARY KEY,
            title TEXT NOT NULL,
            artist_id TEXT NOT NULL,
            year INT,
            duration DOUBLE PRECISION
        );
        CREATE TABLE IF NOT EXISTS artists (
            artist_id TEXT NOT NULL PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT,
            latitude DOUBLE PRECISION,
            longitude DOUBLE PRECISION
        );
        CREATE TABLE IF NOT EXISTS time (
            start_time TIMESTAMP NOT NULL PRIMARY KEY,
            hour INT,
            day INT,
            week INT,
            month INT,
            year INT,
            weekday INT
        );
    ";

    pub const SONG_INSERT: &str = "INSERT INTO songs (song_id, title, artist_id, year, duration)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (song_id) DO NOTHING";

    pub const ARTIST_INSERT: &str = "INSERT INTO artists (artist_id, name, location, latitude, longitude)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (artist_id) DO NOTHING";

    pub const TIME_INSERT: &str = "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (start_time) DO NOTHING";

    pub const USER_INSERT: &str = "INSERT INTO users (user_id, first_name, last_name, gender, level)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (user_id) DO UPDATE SET level = excluded.level";

    pub const SONGPLAY_INSERT: &str = "INSERT INTO songplays
        (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

    pub const SONG_SELECT: &str = "SELECT s.song_id, a.artist_id
        FROM songs s JOIN artists a ON s.artist_id = a.artist_id
        WHERE s.title = ?1 AND a.name = ?2 AND s.duration = ?3
        LIMIT 1";
}

pub mod postgres {
    pub const CREATE_TABLES: &str = "
        CREATE TABLE IF NOT EXISTS songplays (
            songplay_id SERIAL PRIMARY KEY,
            start_time TIMESTAMP NOT NULL,
            user_id BIGINT,
            level VARCHAR,
            song_id VARCHAR,
            artist_id VARCHAR,
            session_id BIGINT,
            location VARCHAR,
            user_agent VARCHAR
        );
        CREATE TABLE IF NOT EXISTS users (
            user_id BIGINT NOT NULL PRIMARY KEY,
            first_name VARCHAR,
            last_name VARCHAR,
            gender VARCHAR,
            level VARCHAR
        );
        CREATE TABLE IF NOT EXISTS songs (
            song_id VARCHAR NOT NULL PRIMARY KEY,
            title VARCHAR NOT NULL,
            artist_id VARCHAR NOT NULL,
            year INT,
            duration DOUBLE PRECISION
        );
        CREATE TABLE IF NOT EXISTS artists (
            artist_id VARCHAR NOT NULL PRIMARY KEY,
            name VARCHAR NOT NULL,
            location VARCHAR,
            latitude DOUBLE PRECISION,
            longitude DOUBLE PRECISION
        );
        CREATE TABLE IF NOT EXISTS time (
            start_time TIMESTAMP NOT NULL PRIMARY KEY,
            hour INT,
            day INT,
            week INT,
            month INT,
            year INT,
            weekday INT
        );
    ";

    pub const SONG_INSERT: &str = "INSERT INTO songs (song_id, title, artist_id, year, duration)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (song_id) DO NOTHING";

    pub const ARTIST_INSERT: &str = "INSERT INTO artists (artist_id, name, location, latitude, longitude)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (artist_id) DO NOTHING";

    pub const TIME_INSERT: &str = "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (start_time) DO NOTHING";

    pub const USER_INSERT: &str = "INSERT INTO users (user_id, first_name, last_name, gender, level)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO UPDATE SET level = EXCLUDED.level";

    pub const SONGPLAY_INSERT: &str = "INSERT INTO songplays
        (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

    pub const SONG_SELECT: &str = "SELECT s.song_id, a.artist_id
        FROM songs s JOIN artists a ON s.artist_id = a.artist_id
        WHERE s.title = $1 AND a.name = $2 AND s.duration = $3
        LIMIT 1";
}

/// `DROP TABLE` statements for every star-schema table
pub fn drop_tables_sql() -> String {
    TABLES
        .iter()
        .map(|table| format!("DROP TABLE IF EXISTS {};", table))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Highest `?N` / `$N` placeholder index in a statement
#[cfg(test)]
pub(crate) fn placeholder_count(statement: &str) -> usize {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?$](\d+)").unwrap());
    PLACEHOLDER
        .captures_iter(statement)
        .filter_map(|c| c[1].parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}
