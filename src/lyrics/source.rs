use std::fs;
use std::path::{Path, PathBuf};

use super::Song;
use crate::error::{Error, Result};

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    pub id: String,
}

impl LyricsQuery {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Supplier of lyric text and optional synchronized timeline
pub trait LyricsSource: Send + Sync {
    fn fetch(&self, query: &LyricsQuery) -> Result<Song>;
}

/// The songs embedded in the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct PresetSource;

impl LyricsSource for PresetSource {
    fn fetch(&self, query: &LyricsQuery) -> Result<Song> {
        super::preset(&query.id)
    }
}

/// A directory of `<id>.txt` lyrics with optional `<id>.lrc` and `<id>.trans.txt`
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn read_optional(&self, file_name: String) -> Result<Option<String>> {
        let path = self.dir.join(file_name);
        if path.exists() {
            Ok(Some(fs::read_to_string(path)?))
        } else {
            Ok(None)
        }
    }
}

impl LyricsSource for FileSource {
    fn fetch(&self, query: &LyricsQuery) -> Result<Song> {
        let id = &query.id;
        let lyrics = self
            .read_optional(format!("{id}.txt"))?
            .ok_or_else(|| Error::SongNotFound(id.clone()))?;

        Ok(Song {
            id: id.clone(),
            title: id.replace('_', " "),
            artist: String::new(),
            lyrics,
            translation: self.read_optional(format!("{id}.trans.txt"))?,
            synced: self.read_optional(format!("{id}.lrc"))?,
        })
    }
}

/// Tries each source in order and returns the first hit
pub struct ChainSource {
    sources: Vec<Box<dyn LyricsSource>>,
}

impl ChainSource {
    pub fn new(sources: Vec<Box<dyn LyricsSource>>) -> Self {
        Self { sources }
    }
}

impl LyricsSource for ChainSource {
    fn fetch(&self, query: &LyricsQuery) -> Result<Song> {
        let mut last_err = Error::SongNotFound(query.id.clone());
        for source in &self.sources {
            match source.fetch(query) {
                Ok(song) => return Ok(song),
                Err(e) => {
                    log::debug!("lyrics source miss for {}: {e}", query.id);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}
