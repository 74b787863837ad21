use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::app_dirs::AppDirs;
use crate::error::Result;

/// Finalized record of one completed session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub title: String,
    pub artist: String,
    pub mode: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub words_correct: usize,
    pub words_wrong: usize,
    pub total_chars: usize,
    pub incorrect_chars: usize,
    pub extra_chars: usize,
    pub duration_seconds: u64,
}

/// A result read back from storage
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub result: SessionResult,
    pub finished_at: DateTime<Local>,
}

/// Receives each completed session's result
pub trait ResultSink {
    fn record(&mut self, result: &SessionResult) -> Result<()>;
}

impl ResultSink for Vec<SessionResult> {
    fn record(&mut self, result: &SessionResult) -> Result<()> {
        self.push(result.clone());
        Ok(())
    }
}

/// Result history in SQLite
#[derive(Debug)]
pub struct SqliteResultStore {
    conn: Connection,
}

impl SqliteResultStore {
    /// Open the store at the default state location
    pub fn open_default() -> Result<Self> {
        Self::open(AppDirs::db_path())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                artist TEXT NOT NULL,
                mode TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                words_correct INTEGER NOT NULL,
                words_wrong INTEGER NOT NULL,
                total_chars INTEGER NOT NULL,
                incorrect_chars INTEGER NOT NULL,
                extra_chars INTEGER NOT NULL,
                duration_seconds INTEGER NOT NULL,
                finished_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_results_finished ON session_results(finished_at)",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Most recent results first
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT title, artist, mode, wpm, accuracy, words_correct, words_wrong,
                   total_chars, incorrect_chars, extra_chars, duration_seconds, finished_at
            FROM session_results
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let finished_at: String = row.get(11)?;
            let finished_at = DateTime::parse_from_rfc3339(&finished_at)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| Local::now());

            Ok(StoredResult {
                result: SessionResult {
                    title: row.get(0)?,
                    artist: row.get(1)?,
                    mode: row.get(2)?,
                    wpm: row.get(3)?,
                    accuracy: row.get(4)?,
                    words_correct: row.get::<_, i64>(5)? as usize,
                    words_wrong: row.get::<_, i64>(6)? as usize,
                    total_chars: row.get::<_, i64>(7)? as usize,
                    incorrect_chars: row.get::<_, i64>(8)? as usize,
                    extra_chars: row.get::<_, i64>(9)? as usize,
                    duration_seconds: row.get::<_, i64>(10)? as u64,
                },
                finished_at,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn best_wpm(&self, title: &str) -> Result<Option<u32>> {
        let best = self.conn.query_row(
            "SELECT MAX(wpm) FROM session_results WHERE title = ?1",
            params![title],
            |row| row.get::<_, Option<u32>>(0),
        )?;
        Ok(best)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session_results", [])?;
        Ok(())
    }
}

impl ResultSink for SqliteResultStore {
    fn record(&mut self, result: &SessionResult) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO session_results
            (title, artist, mode, wpm, accuracy, words_correct, words_wrong,
             total_chars, incorrect_chars, extra_chars, duration_seconds, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                result.title,
                result.artist,
                result.mode,
                result.wpm,
                result.accuracy,
                result.words_correct as i64,
                result.words_wrong as i64,
                result.total_chars as i64,
                result.incorrect_chars as i64,
                result.extra_chars as i64,
                result.duration_seconds as i64,
                Local::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
