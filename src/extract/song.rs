use crate::error::EtlError;
use crate::parser;
use crate::sink::Sink;
use crate::types::{FileStats, SongMetadata};
use std::path::Path;

/// Load one song-metadata file into the `songs` and `artists` tables
///
/// The file holds a single record; anything after the first record is ignored.
pub fn process_song_file<S: Sink + ?Sized>(sink: &mut S, path: &Path) -> Result<FileStats, EtlError> {
    let parsed = parser::parse_first::<SongMetadata>(path)?
        .ok_or_else(|| EtlError::EmptyFile(path.to_path_buf()))?;

    for (field, value) in [
        ("song_id", &parsed.record.song_id),
        ("artist_id", &parsed.record.artist_id),
    ] {
        if value.trim().is_empty() {
            return Err(EtlError::Parse {
                path: path.to_path_buf(),
                line: parsed.line,
                message: format!("{} must not be empty", field),
            });
        }
    }

    let (song, artist) = parsed.record.split();
    sink.insert_song(&song)?;
    sink.insert_artist(&artist)?;

    tracing::debug!("Loaded song {} by artist {}", song.song_id, artist.artist_id);

    Ok(FileStats {
        files: 1,
        records: 1,
        songs: 1,
        artists: 1,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::types::{ArtistRecord, SongRecord};
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_song_and_artist_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "TRAAAAW128F429D538.json",
            r#"{"song_id":"S1","title":"X","artist_id":"A1","year":2000,"duration":200.5,"artist_name":"Y","artist_location":"","artist_latitude":null,"artist_longitude":null}"#,
        );

        let mut sink = MemorySink::new();
        let stats = process_song_file(&mut sink, &path).unwrap();
        sink.commit().unwrap();

        assert_eq!(stats.songs, 1);
        assert_eq!(stats.artists, 1);
        assert_eq!(
            sink.committed().songs(),
            vec![SongRecord {
                song_id: "S1".to_string(),
                title: "X".to_string(),
                artist_id: "A1".to_string(),
                year: 2000,
                duration: 200.5,
            }]
        );
        assert_eq!(
            sink.committed().artists(),
            vec![ArtistRecord {
                artist_id: "A1".to_string(),
                name: "Y".to_string(),
                location: Some(String::new()),
                latitude: None,
                longitude: None,
            }]
        );
    }

    #[test]
    fn test_only_first_record_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "two.json",
            concat!(
                r#"{"song_id":"S1","title":"X","artist_id":"A1","year":2000,"duration":200.5,"artist_name":"Y"}"#,
                "\n",
                r#"{"song_id":"S2","title":"Z","artist_id":"A2","year":2001,"duration":100.0,"artist_name":"W"}"#,
            ),
        );

        let mut sink = MemorySink::new();
        process_song_file(&mut sink, &path).unwrap();
        sink.commit().unwrap();

        assert_eq!(sink.committed().songs().len(), 1);
        assert_eq!(sink.committed().songs()[0].song_id, "S1");
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "empty.json", "");

        let mut sink = MemorySink::new();
        let result = process_song_file(&mut sink, &path);
        assert!(matches!(result, Err(EtlError::EmptyFile(_))));
        assert_eq!(sink.pending(), 0);
    }

    #[test]
    fn test_empty_song_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "blank.json",
            r#"{"song_id":"","title":"X","artist_id":"A1","year":2000,"duration":200.5,"artist_name":"Y"}"#,
        );

        let mut sink = MemorySink::new();
        let result = process_song_file(&mut sink, &path);
        assert!(matches!(result, Err(EtlError::Parse { line: 1, .. })));
        assert_eq!(sink.pending(), 0);
    }
}
