use super::Sink;
use crate::error::SinkError;
use crate::types::{ArtistRecord, SongMatch, SongRecord, SongplayRecord, TimeRecord, UserRecord};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};

/// Star-schema tables held in memory
///
/// Rows keep insertion order. Key indexes give the same conflict rules as the SQL
/// sinks without scanning: duplicate songs, artists and timestamps are dropped,
/// a repeated user only updates `level`.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    songs: Vec<SongRecord>,
    artists: Vec<ArtistRecord>,
    times: Vec<TimeRecord>,
    users: Vec<UserRecord>,
    songplays: Vec<SongplayRecord>,

    song_ids: HashSet<String>,
    songs_by_title: HashMap<String, Vec<usize>>,
    artist_index: HashMap<String, usize>,
    time_keys: HashSet<NaiveDateTime>,
    user_index: HashMap<i64, usize>,
}

impl Tables {
    pub fn songs(&self) -> &[SongRecord] {
        &self.songs
    }

    pub fn artists(&self) -> &[ArtistRecord] {
        &self.artists
    }

    pub fn times(&self) -> &[TimeRecord] {
        &self.times
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn songplays(&self) -> &[SongplayRecord] {
        &self.songplays
    }

    fn has_song(&self, song_id: &str) -> bool {
        self.song_ids.contains(song_id)
    }

    fn has_artist(&self, artist_id: &str) -> bool {
        self.artist_index.contains_key(artist_id)
    }

    fn has_time(&self, start_time: &NaiveDateTime) -> bool {
        self.time_keys.contains(start_time)
    }

    fn insert_song(&mut self, song: SongRecord) {
        if !self.song_ids.insert(song.song_id.clone()) {
            return;
        }
        self.songs_by_title
            .entry(song.title.clone())
            .or_default()
            .push(self.songs.len());
        self.songs.push(song);
    }

    fn insert_artist(&mut self, artist: ArtistRecord) {
        if self.has_artist(&artist.artist_id) {
            return;
        }
        self.artist_index.insert(artist.artist_id.clone(), self.artists.len());
        self.artists.push(artist);
    }

    fn insert_time(&mut self, time: TimeRecord) {
        if self.time_keys.insert(time.start_time) {
            self.times.push(time);
        }
    }

    fn upsert_user(&mut self, user: UserRecord) {
        let Some(user_id) = user.user_id else {
            return;
        };
        match self.user_index.get(&user_id) {
            Some(&i) => self.users[i].level = user.level,
            None => {
                self.user_index.insert(user_id, self.users.len());
                self.users.push(user);
            }
        }
    }

    /// Apply every row of `other`, table by table in its insertion order
    fn merge(&mut self, other: Tables) {
        for song in other.songs {
            self.insert_song(song);
        }
        for artist in other.artists {
            self.insert_artist(artist);
        }
        for time in other.times {
            self.insert_time(time);
        }
        for user in other.users {
            self.upsert_user(user);
        }
        self.songplays.extend(other.songplays);
    }

    fn songs_titled<'a>(&'a self, title: &str) -> impl Iterator<Item = &'a SongRecord> + 'a {
        self.songs_by_title
            .get(title)
            .into_iter()
            .flatten()
            .map(move |&i| &self.songs[i])
    }

    fn artist(&self, artist_id: &str) -> Option<&ArtistRecord> {
        self.artist_index.get(artist_id).map(|&i| &self.artists[i])
    }
}

/// In-process sink with commit semantics
///
/// Writes are staged until `commit`, then merged into the committed tables. Lookups
/// see staged writes, as a database transaction sees its own writes.
#[derive(Debug, Default)]
pub struct MemorySink {
    committed: Tables,
    staged: Tables,
    pending: usize,
    commits: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables as of the last commit
    pub fn committed(&self) -> &Tables {
        &self.committed
    }

    /// Number of writes waiting for a commit
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Number of commits that made at least one write durable
    pub fn commits(&self) -> usize {
        self.commits
    }

    fn artist(&self, artist_id: &str) -> Option<&ArtistRecord> {
        self.committed
            .artist(artist_id)
            .or_else(|| self.staged.artist(artist_id))
    }
}

impl Sink for MemorySink {
    fn insert_song(&mut self, song: &SongRecord) -> Result<(), SinkError> {
        self.pending += 1;
        if !self.committed.has_song(&song.song_id) {
            self.staged.insert_song(song.clone());
        }
        Ok(())
    }

    fn insert_artist(&mut self, artist: &ArtistRecord) -> Result<(), SinkError> {
        self.pending += 1;
        if !self.committed.has_artist(&artist.artist_id) {
            self.staged.insert_artist(artist.clone());
        }
        Ok(())
    }

    fn insert_time(&mut self, time: &TimeRecord) -> Result<(), SinkError> {
        self.pending += 1;
        if !self.committed.has_time(&time.start_time) {
            self.staged.insert_time(time.clone());
        }
        Ok(())
    }

    fn insert_user(&mut self, user: &UserRecord) -> Result<(), SinkError> {
        if user.user_id.is_none() {
            return Err(SinkError::Constraint {
                table: "users",
                message: "user_id must not be null".to_string(),
            });
        }
        self.pending += 1;
        self.staged.upsert_user(user.clone());
        Ok(())
    }

    fn insert_songplay(&mut self, songplay: &SongplayRecord) -> Result<(), SinkError> {
        self.pending += 1;
        self.staged.songplays.push(songplay.clone());
        Ok(())
    }

    fn find_song(
        &mut self,
        title: Option<&str>,
        artist: Option<&str>,
        length: Option<f64>,
    ) -> Result<Option<SongMatch>, SinkError> {
        let (Some(title), Some(artist), Some(length)) = (title, artist, length) else {
            return Ok(None);
        };

        let found = [&self.committed, &self.staged]
            .into_iter()
            .flat_map(|tables| tables.songs_titled(title))
            .filter(|song| song.duration == length)
            .find_map(|song| {
                self.artist(&song.artist_id)
                    .filter(|a| a.name == artist)
                    .map(|a| SongMatch {
                        song_id: song.song_id.clone(),
                        artist_id: a.artist_id.clone(),
                    })
            });
        Ok(found)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        if self.pending == 0 {
            return Ok(());
        }
        let staged = std::mem::take(&mut self.staged);
        self.committed.merge(staged);
        self.pending = 0;
        self.commits += 1;
        Ok(())
    }
}
