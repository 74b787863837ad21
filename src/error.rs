use thiserror::Error;

/// Errors surfaced by lyrik outside of the typing engine's never-fatal paths
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The source text segmented into zero words.
    #[error("text contains no words to type")]
    EmptyText,

    #[error("song not found: {0}")]
    SongNotFound(String),

    /// A fetch reply arrived for a request that was superseded.
    #[error("fetch cancelled")]
    FetchCancelled,

    #[error("lyrics source error: {message}")]
    Source { message: String },
}

impl Error {
    pub fn source_error(message: impl Into<String>) -> Self {
        Error::Source {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
