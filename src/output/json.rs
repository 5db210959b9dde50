//! JSON archive writer
//!
//! Produces three documents in the output directory:
//!
//! - `users.json`: the full member directory
//! - `channels.json`: selected channels with embedded history and threads
//! - `channel-users.json`: members that authored a retrieved message
//!
//! Output is UTF-8 with non-ASCII characters left unescaped and 4-space
//! indentation. Every document is serialized before any file is touched, then
//! each is written to a temp file in the target directory, fsynced and
//! renamed into place.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{ArchiveWriter, OutputError, OutputResult};
use crate::crawler::Archive;

/// Member directory document
pub const USERS_FILE: &str = "users.json";
/// Channel hierarchy document
pub const CHANNELS_FILE: &str = "channels.json";
/// Referenced user index document
pub const CHANNEL_USERS_FILE: &str = "channel-users.json";

const INDENT: &[u8] = b"    ";

/// Writes an [`Archive`] as three JSON documents
#[derive(Debug, Clone)]
pub struct JsonArchiveWriter {
    output_dir: PathBuf,
}

impl JsonArchiveWriter {
    /// Writer targeting `output_dir`, created on first write if missing
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Target directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn persist(&self, name: &str, bytes: &[u8]) -> OutputResult<PathBuf> {
        let path = self.output_dir.join(name);

        let mut temp_file = NamedTempFile::new_in(&self.output_dir)
            .map_err(|e| OutputError::IoError(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(bytes)
            .map_err(|e| OutputError::IoError(format!("Failed to write {name}: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| OutputError::IoError(format!("Failed to flush {name}: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync {name}: {e}")))?;
        temp_file
            .persist(&path)
            .map_err(|e| OutputError::IoError(format!("Failed to persist {name}: {e}")))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Wrote archive document");
        Ok(path)
    }
}

impl ArchiveWriter for JsonArchiveWriter {
    fn write_archive(&self, archive: &Archive) -> OutputResult<Vec<PathBuf>> {
        let documents = [
            (USERS_FILE, to_json(&archive.users)?),
            (CHANNELS_FILE, to_json(&archive.channels)?),
            (CHANNEL_USERS_FILE, to_json(&archive.channel_users)?),
        ];

        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create {}: {e}",
                self.output_dir.display()
            ))
        })?;

        let mut written = Vec::with_capacity(documents.len());
        for (name, bytes) in &documents {
            written.push(self.persist(name, bytes)?);
        }

        // Make the renames durable
        if let Ok(dir) = File::open(&self.output_dir) {
            let _ = dir.sync_all();
        }

        info!(
            output_dir = %self.output_dir.display(),
            files = written.len(),
            "Archive written"
        );
        Ok(written)
    }
}

/// Serialize with 4-space indentation, non-ASCII left as UTF-8
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> OutputResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value
        .serialize(&mut serializer)
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    buf.push(b'\n');
    Ok(buf)
}
