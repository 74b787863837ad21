pub mod fetch;
pub mod source;
pub mod synced;

pub use fetch::{CancelToken, FetchReply, Fetcher};
pub use source::{ChainSource, FileSource, LyricsQuery, LyricsSource, PresetSource};
pub use synced::{parse_synced_lyrics, SyncedLine};

use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static SONGS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/songs");

/// A song as supplied by a lyrics source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub lyrics: String,
    /// Translated text, line-parallel to `lyrics`
    #[serde(default)]
    pub translation: Option<String>,
    /// Raw `[mm:ss.xx] text` synchronized lyrics
    #[serde(default)]
    pub synced: Option<String>,
}

impl Song {
    /// A song built from user supplied text
    pub fn custom(text: impl Into<String>) -> Self {
        Self {
            id: "custom".to_string(),
            title: "Custom".to_string(),
            artist: String::new(),
            lyrics: text.into(),
            translation: None,
            synced: None,
        }
    }

    /// The parsed synchronized timeline, empty when the song has none
    pub fn timeline(&self) -> Vec<SyncedLine> {
        self.synced
            .as_deref()
            .map(parse_synced_lyrics)
            .unwrap_or_default()
    }
}

/// All embedded preset songs, ordered by id
pub fn presets() -> Result<Vec<Song>> {
    let mut songs = SONGS_DIR
        .files()
        .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
        .map(|f| read_song(f.contents()))
        .collect::<Result<Vec<Song>>>()?;
    songs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(songs)
}

/// Look up one embedded preset by id
pub fn preset(id: &str) -> Result<Song> {
    let file = SONGS_DIR
        .get_file(format!("{id}.json"))
        .ok_or_else(|| Error::SongNotFound(id.to_string()))?;
    read_song(file.contents())
}

fn read_song(bytes: &[u8]) -> Result<Song> {
    Ok(serde_json::from_slice(bytes)?)
}
