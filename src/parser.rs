//! Newline-delimited JSON reader
//!
//! Each non-blank line is decoded into a typed record, which may be a raw
//! `serde_json::Value` that is narrowed later with [`decode`]. Lines go through
//! simd-json first and fall back to serde_json, which also supplies the error
//! message when a line is rejected.

use crate::error::EtlError;
use crate::types::ParsedRecord;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

/// Parse every record of a JSON-lines file, in file order
pub fn parse_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<ParsedRecord<T>>, EtlError> {
    let content = std::fs::read_to_string(path).map_err(|source| EtlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(path, &content)
}

/// Parse only the first record of a file, if any
pub fn parse_first<T: DeserializeOwned>(path: &Path) -> Result<Option<ParsedRecord<T>>, EtlError> {
    let content = std::fs::read_to_string(path).map_err(|source| EtlError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = parse_line(path, idx + 1, line)?;
        return Ok(Some(ParsedRecord {
            line: idx + 1,
            record,
        }));
    }

    Ok(None)
}

/// Parse JSON-lines content; `path` is only used for error reporting
pub fn parse_str<T: DeserializeOwned>(path: &Path, content: &str) -> Result<Vec<ParsedRecord<T>>, EtlError> {
    let mut records = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = parse_line(path, idx + 1, line)?;
        records.push(ParsedRecord {
            line: idx + 1,
            record,
        });
    }

    Ok(records)
}

/// Decode a record read as a raw JSON value into its typed form
pub fn decode<T: DeserializeOwned>(path: &Path, raw: ParsedRecord<Value>) -> Result<ParsedRecord<T>, EtlError> {
    let record = serde_json::from_value(raw.record).map_err(|e| EtlError::Parse {
        path: path.to_path_buf(),
        line: raw.line,
        message: e.to_string(),
    })?;
    Ok(ParsedRecord {
        line: raw.line,
        record,
    })
}

fn parse_line<T: DeserializeOwned>(path: &Path, line_no: usize, line: &str) -> Result<T, EtlError> {
    // simd-json parses in place
    let mut buffer = line.as_bytes().to_vec();
    if let Ok(record) = simd_json::serde::from_slice::<T>(&mut buffer) {
        return Ok(record);
    }

    serde_json::from_str(line).map_err(|e| EtlError::Parse {
        path: path.to_path_buf(),
        line: line_no,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LogEvent, SongMetadata};

    #[test]
    fn test_parse_lines_in_order() {
        let content = r#"{"page":"NextSong","ts":1541105830796,"userId":"39"}

{"page":"Home","ts":1541106106796,"userId":"8"}
"#;
        let records: Vec<ParsedRecord<LogEvent>> = parse_str(Path::new("log.json"), content).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 1);
        assert_eq!(records[0].record.user_id, Some(39));
        // Blank line 2 is skipped but still counted
        assert_eq!(records[1].line, 3);
        assert_eq!(records[1].record.page.as_deref(), Some("Home"));
    }

    #[test]
    fn test_malformed_line() {
        let content = "{\"page\":\"NextSong\"}\n{\"page\": \n";
        let result: Result<Vec<ParsedRecord<LogEvent>>, _> = parse_str(Path::new("bad.json"), content);

        match result {
            Err(EtlError::Parse { line, path, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(path, Path::new("bad.json"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_field() {
        let content = r#"{"song_id":"S1","title":"X"}"#;
        let result: Result<Vec<ParsedRecord<SongMetadata>>, _> = parse_str(Path::new("song.json"), content);
        assert!(matches!(result, Err(EtlError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_decode_raw_record() {
        let content = "{\"page\":\"Home\",\"sessionId\":\"n/a\"}\n{\"page\":\"NextSong\",\"sessionId\":12}\n";
        let raw: Vec<ParsedRecord<Value>> = parse_str(Path::new("log.json"), content).unwrap();
        assert_eq!(raw.len(), 2);

        let mut raw = raw.into_iter();
        let home = raw.next().unwrap();
        let play = raw.next().unwrap();

        let result = decode::<LogEvent>(Path::new("log.json"), home);
        assert!(matches!(result, Err(EtlError::Parse { line: 1, .. })));

        let event = decode::<LogEvent>(Path::new("log.json"), play).unwrap();
        assert_eq!(event.line, 2);
        assert_eq!(event.record.session_id, Some(12));
    }

    #[test]
    fn test_empty_content() {
        let records: Vec<ParsedRecord<LogEvent>> = parse_str(Path::new("empty.json"), "\n\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result: Result<Vec<ParsedRecord<LogEvent>>, _> =
            parse_records(Path::new("/nonexistent/dir/file.json"));
        assert!(matches!(result, Err(EtlError::Io { .. })));
    }
}
