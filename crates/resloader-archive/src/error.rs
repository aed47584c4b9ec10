use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid resource path '{path}'")]
    InvalidPath { path: String },

    #[error("archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    #[error("failed to open archive '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("entry '{entry}' not found in '{archive}'")]
    EntryNotFound { archive: PathBuf, entry: String },

    #[error("archive '{archive}' is corrupted: {source}")]
    Corrupted {
        archive: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("failed to decompress '{entry}' from '{archive}': {source}")]
    CorruptedEntry {
        archive: PathBuf,
        entry: String,
        source: io::Error,
    },

    #[error("entry '{entry}' in '{archive}' is a directory, not a nested archive")]
    NotAnArchive { archive: PathBuf, entry: String },

    #[error("archive nesting depth {depth} exceeds limit {limit}")]
    NestingTooDeep { depth: usize, limit: usize },

    #[error("zip-slip attack detected: entry '{entry}' resolves to '{resolved}'")]
    ZipSlip { entry: String, resolved: PathBuf },

    #[error("failed to create staging directory: {source}")]
    Staging { source: io::Error },

    #[error(transparent)]
    Fs(#[from] resloader_fs::Error),
}

impl Error {
    /// Whether the requested archive or entry does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ArchiveNotFound(_) | Self::EntryNotFound { .. } | Self::Fs(resloader_fs::Error::NotFound(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
