use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Index file not found: {}", .0.display())]
    IndexFileMissing(PathBuf),

    #[error("Metadata file not found: {}", .0.display())]
    MetadataFileMissing(PathBuf),

    #[error("Unsupported index format: {0}")]
    UnsupportedIndexFormat(String),

    #[error("Corrupt index {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Invalid metadata {}: {source}", path.display())]
    InvalidMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Query has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding service failed: {0}")]
    EmbeddingService(String),

    #[error("No collections available: empty question or empty collection set")]
    NoCollectionsAvailable,

    #[error("Chat model failed: {0}")]
    Chat(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
