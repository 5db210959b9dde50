//! Archive writers

use std::path::PathBuf;

use crate::crawler::Archive;

pub mod json;

pub use json::{JsonArchiveWriter, CHANNELS_FILE, CHANNEL_USERS_FILE, USERS_FILE};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Persists a completed archive
pub trait ArchiveWriter {
    /// Write every document of `archive`, returning the paths written
    ///
    /// Either all documents are written or none are replaced.
    fn write_archive(&self, archive: &Archive) -> OutputResult<Vec<PathBuf>>;
}
