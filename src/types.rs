use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};

/// A decoded record together with the 1-based line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord<T> {
    pub line: usize,
    pub record: T,
}

/// One record of a song-metadata file, as found on disk
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SongMetadata {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

impl SongMetadata {
    /// Split the metadata record into its song and artist rows
    pub fn split(self) -> (SongRecord, ArtistRecord) {
        let song = SongRecord {
            song_id: self.song_id,
            title: self.title,
            artist_id: self.artist_id.clone(),
            year: self.year,
            duration: self.duration,
        };
        let artist = ArtistRecord {
            artist_id: self.artist_id,
            name: self.artist_name,
            location: self.artist_location,
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        };
        (song, artist)
    }
}

/// A row of the `songs` dimension
#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
}

/// A row of the `artists` dimension
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRecord {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One line of an application event log
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    #[serde(default)]
    pub page: Option<String>,

    /// Epoch milliseconds
    #[serde(default)]
    pub ts: Option<i64>,

    #[serde(default, deserialize_with = "lenient_user_id")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl LogEvent {
    /// Only song plays feed the star schema
    pub const NEXT_SONG: &'static str = "NextSong";

    /// Check the `page` of a raw event line before it is decoded as a `LogEvent`
    ///
    /// Other pages are dropped without looking at their remaining fields.
    pub fn is_song_play(raw: &serde_json::Value) -> bool {
        raw.get("page").and_then(serde_json::Value::as_str) == Some(Self::NEXT_SONG)
    }
}

/// Accepts `39`, `"39"` and `""` (absent)
fn lenient_user_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Int(id)) => Ok(Some(id)),
        Some(RawId::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<i64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid userId: {:?}", text)))
        }
    }
}

/// A row of the `time` dimension, derived from one song play
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRecord {
    pub start_time: NaiveDateTime,
    pub hour: u32,
    pub day: u32,
    /// ISO 8601 week number
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// Monday = 0 .. Sunday = 6
    pub weekday: u32,
}

/// A row of the `users` dimension
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

/// A row of the `songplays` fact table
#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRecord {
    pub start_time: NaiveDateTime,
    pub user_id: Option<i64>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Song and artist keys resolved for a log event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

/// Row counts produced while processing files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    pub files: usize,
    pub records: usize,
    pub songs: usize,
    pub artists: usize,
    pub times: usize,
    pub users: usize,
    pub songplays: usize,
    /// Songplays whose song/artist could not be resolved
    pub unresolved: usize,
}

impl FileStats {
    pub fn merge(&mut self, other: &FileStats) {
        self.files += other.files;
        self.records += other.records;
        self.songs += other.songs;
        self.artists += other.artists;
        self.times += other.times;
        self.users += other.users;
        self.songplays += other.songplays;
        self.unresolved += other.unresolved;
    }
}
