use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Page recognition error on page {page}: {message}")]
    PageRecognition { page: usize, message: String },

    #[error("Page {page} is out of bounds (document has {total} pages)")]
    PageOutOfBounds { page: usize, total: usize },

    #[error("Page range {start}..={end} lies entirely outside the document ({total} pages)")]
    PageRange {
        start: usize,
        end: usize,
        total: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Checkpoint write to {path} failed: {message}")]
    Checkpoint { path: PathBuf, message: String },

    #[error("Job already finalized")]
    JobFinalized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
