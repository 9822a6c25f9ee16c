use std::path::PathBuf;

use thiserror::Error;

/// Failures of the archive-facing operations. Decompiler failures have
/// their own type in `decompiler_io`.
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("Archive unreadable: {path}: {reason}")]
    ArchiveUnreadable { path: PathBuf, reason: String },

    #[error("Failed to read entry {entry}: {reason}")]
    ReadError { entry: String, reason: String },

    #[error("Failed to allocate scratch workspace: {0}")]
    WorkspaceAllocationFailed(#[source] std::io::Error),

    #[error("Entry {entry} is not a valid archive: {reason}")]
    InvalidArchive { entry: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,
}

pub type BrowserResult<T> = Result<T, BrowserError>;

impl BrowserError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArchiveUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn read(entry: &str, reason: impl ToString) -> Self {
        Self::ReadError {
            entry: entry.to_string(),
            reason: reason.to_string(),
        }
    }
}
