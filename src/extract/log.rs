use crate::config::TimeZoneMode;
use crate::error::EtlError;
use crate::parser;
use crate::sink::Sink;
use crate::types::{FileStats, LogEvent, ParsedRecord, SongplayRecord, TimeRecord, UserRecord};
use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike};
use serde_json::Value;
use std::path::Path;

/// Derive the `time` row for an epoch-millisecond timestamp
///
/// Returns `None` when the timestamp is outside chrono's representable range.
pub fn derive_time(ts_millis: i64, tz: TimeZoneMode) -> Option<TimeRecord> {
    let utc = DateTime::from_timestamp_millis(ts_millis)?;
    let start_time: NaiveDateTime = match tz {
        TimeZoneMode::Utc => utc.naive_utc(),
        TimeZoneMode::Local => utc.with_timezone(&Local).naive_local(),
    };

    Some(TimeRecord {
        start_time,
        hour: start_time.hour(),
        day: start_time.day(),
        week: start_time.iso_week().week(),
        month: start_time.month(),
        year: start_time.year(),
        weekday: start_time.weekday().num_days_from_monday(),
    })
}

/// Load one event log file into the `time`, `users` and `songplays` tables
///
/// Only `NextSong` events are used; other lines only have to be valid JSON. Rows go
/// out table by table, each in file order: every time row, then every user row,
/// then every songplay.
pub fn process_log_file<S: Sink + ?Sized>(
    sink: &mut S,
    path: &Path,
    tz: TimeZoneMode,
) -> Result<FileStats, EtlError> {
    let records = parser::parse_records::<Value>(path)?;
    let mut stats = FileStats {
        files: 1,
        records: records.len(),
        ..Default::default()
    };

    let plays: Vec<ParsedRecord<LogEvent>> = records
        .into_iter()
        .filter(|raw| LogEvent::is_song_play(&raw.record))
        .map(|raw| parser::decode(path, raw))
        .collect::<Result<_, _>>()?;

    // Resolve every timestamp before writing anything
    let mut times = Vec::with_capacity(plays.len());
    for parsed in &plays {
        let time = parsed
            .record
            .ts
            .and_then(|ts| derive_time(ts, tz))
            .ok_or_else(|| EtlError::Timestamp {
                path: path.to_path_buf(),
                line: parsed.line,
                ts: parsed.record.ts,
            })?;
        times.push(time);
    }

    for time in &times {
        sink.insert_time(time)?;
        stats.times += 1;
    }

    for parsed in &plays {
        let event = &parsed.record;
        sink.insert_user(&UserRecord {
            user_id: event.user_id,
            first_name: event.first_name.clone(),
            last_name: event.last_name.clone(),
            gender: event.gender.clone(),
            level: event.level.clone(),
        })?;
        stats.users += 1;
    }

    for (parsed, time) in plays.iter().zip(&times) {
        let event = &parsed.record;
        let found = sink.find_song(event.song.as_deref(), event.artist.as_deref(), event.length)?;
        if found.is_none() {
            stats.unresolved += 1;
        }
        let (song_id, artist_id) = match found {
            Some(m) => (Some(m.song_id), Some(m.artist_id)),
            None => (None, None),
        };

        sink.insert_songplay(&SongplayRecord {
            start_time: time.start_time,
            user_id: event.user_id,
            level: event.level.clone(),
            song_id,
            artist_id,
            session_id: event.session_id,
            location: event.location.clone(),
            user_agent: event.user_agent.clone(),
        })?;
        stats.songplays += 1;
    }

    tracing::debug!(
        "{}: {} events, {} song plays, {} unresolved",
        path.display(),
        stats.records,
        stats.songplays,
        stats.unresolved
    );

    Ok(stats)
}
