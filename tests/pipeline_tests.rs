//! End-to-end load tests over a small song_data / log_data tree

use serde_json::json;
use sparkify_etl::{run, EtlConfig, EtlError, MemorySink, Progress, SqliteSink, TimeZoneMode};
use std::path::{Path, PathBuf};

fn write_json_lines(path: &Path, records: &[serde_json::Value]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let content: Vec<String> = records.iter().map(|r| r.to_string()).collect();
    std::fs::write(path, content.join("\n")).unwrap();
}

fn song(song_id: &str, title: &str, artist_id: &str, artist_name: &str, duration: f64) -> serde_json::Value {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": null,
        "artist_longitude": null,
        "artist_location": "",
        "artist_name": artist_name,
        "song_id": song_id,
        "title": title,
        "duration": duration,
        "year": 0
    })
}

fn play(page: &str, ts: i64, user_id: &str, level: &str, song: &str, artist: &str, length: f64) -> serde_json::Value {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": "Kate",
        "gender": "F",
        "itemInSession": 1,
        "lastName": "Harrell",
        "length": length,
        "level": level,
        "location": "Lansing-East Lansing, MI",
        "method": "PUT",
        "page": page,
        "registration": 1.540472624796e12,
        "sessionId": 293,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0",
        "userId": user_id
    })
}

/// Two song files and one log file with 3 song plays and 2 other events
fn data_tree(root: &Path) -> EtlConfig {
    let song_data = root.join("song_data");
    let log_data = root.join("log_data");

    write_json_lines(
        &song_data.join("A/A/A/TRAAAAW128F429D538.json"),
        &[song("SOUDSGM12AC9618304", "Insatiable", "ARNTLGG11E2835DDB9", "Darrell Scott", 266.39628)],
    );
    write_json_lines(
        &song_data.join("A/B/C/TRABCEI128F424C983.json"),
        &[song("SOBLFFE12AF72AA5BA", "Scream", "ARJNIUY12298900C91", "Adelitas Way", 213.9424)],
    );

    write_json_lines(
        &log_data.join("2018/11/2018-11-15-events.json"),
        &[
            play("NextSong", 1542241826796, "26", "free", "Insatiable", "Darrell Scott", 266.39628),
            play("Home", 1542242481796, "26", "free", "", "", 0.0),
            play("NextSong", 1542242481796, "26", "paid", "Unknown Song", "Nobody", 100.0),
            play("Logout", 1542242581796, "26", "paid", "", "", 0.0),
            play("NextSong", 1542253449796, "80", "paid", "Scream", "Adelitas Way", 213.9424),
        ],
    );

    EtlConfig {
        song_data,
        log_data,
        timezone: TimeZoneMode::Utc,
        ..EtlConfig::default()
    }
}

#[test]
fn test_full_load_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let config = data_tree(dir.path());
    let mut sink = SqliteSink::in_memory().unwrap();

    let summary = run(&config, &mut sink, |_| {}).unwrap();

    assert_eq!(summary.songs.files, 2);
    assert_eq!(summary.logs.files, 1);
    assert_eq!(summary.logs.records, 5);
    assert_eq!(summary.logs.times, 3);
    assert_eq!(summary.logs.users, 3);
    assert_eq!(summary.logs.songplays, 3);
    assert_eq!(summary.logs.unresolved, 1);

    assert_eq!(sink.count("songs").unwrap(), 2);
    assert_eq!(sink.count("artists").unwrap(), 2);
    assert_eq!(sink.count("time").unwrap(), 3);
    assert_eq!(sink.count("users").unwrap(), 2);
    assert_eq!(sink.count("songplays").unwrap(), 3);

    // Later events overwrite the subscription level
    assert_eq!(sink.user_level(26).unwrap().as_deref(), Some("paid"));

    let resolved: Vec<(Option<String>, Option<String>)> = {
        let mut stmt = sink
            .connection()
            .prepare("SELECT song_id, artist_id FROM songplays ORDER BY songplay_id")
            .unwrap();
        let rows: Vec<(Option<String>, Option<String>)> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        rows
    };
    assert_eq!(
        resolved,
        vec![
            (Some("SOUDSGM12AC9618304".to_string()), Some("ARNTLGG11E2835DDB9".to_string())),
            (None, None),
            (Some("SOBLFFE12AF72AA5BA".to_string()), Some("ARJNIUY12298900C91".to_string())),
        ]
    );
}

#[test]
fn test_progress_reported_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = data_tree(dir.path());
    let mut sink = MemorySink::new();
    let mut lines = Vec::new();

    run(&config, &mut sink, |p| match p {
        Progress::Found { total, .. } => lines.push(format!("found {}", total)),
        Progress::Processed { done, total } => lines.push(format!("{}/{}", done, total)),
    })
    .unwrap();

    assert_eq!(lines, vec!["found 2", "1/2", "2/2", "found 1", "1/1"]);
    assert_eq!(sink.commits(), 3);
}

#[test]
fn test_time_rows_match_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let config = data_tree(dir.path());
    let mut sink = MemorySink::new();

    run(&config, &mut sink, |_| {}).unwrap();

    let times = &sink.committed().times();
    assert_eq!(times.len(), 3);
    // 2018-11-15 00:30:26 UTC, Thursday of ISO week 46
    assert_eq!(times[0].start_time.to_string(), "2018-11-15 00:30:26.796");
    assert_eq!((times[0].hour, times[0].day, times[0].week), (0, 15, 46));
    assert_eq!((times[0].month, times[0].year, times[0].weekday), (11, 2018, 3));
}

#[test]
fn test_bad_log_file_keeps_committed_songs() {
    let dir = tempfile::tempdir().unwrap();
    let config = data_tree(dir.path());
    std::fs::write(config.log_data.join("2018/11/2018-11-16-events.json"), "{not json}\n").unwrap();

    let mut sink = MemorySink::new();
    let result = run(&config, &mut sink, |_| {});

    match result {
        Err(EtlError::Parse { path, line, .. }) => {
            assert!(path.ends_with("2018-11-16-events.json"));
            assert_eq!(line, 1);
        }
        other => panic!("expected parse error, got {:?}", other),
    }

    let tables = sink.committed();
    assert_eq!(tables.songs().len(), 2);
    assert_eq!(tables.songplays().len(), 3);
}

#[test]
fn test_empty_data_directories() {
    let dir = tempfile::tempdir().unwrap();
    let config = EtlConfig {
        song_data: dir.path().join("missing_songs"),
        log_data: PathBuf::from(dir.path()),
        ..EtlConfig::default()
    };

    let mut sink = MemorySink::new();
    let summary = run(&config, &mut sink, |_| {}).unwrap();

    assert_eq!(summary.songs.files, 0);
    assert_eq!(summary.logs.files, 0);
    assert_eq!(sink.commits(), 0);
}
