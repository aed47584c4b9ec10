use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to set permissions on '{path}': {source}")]
    Permissions { path: PathBuf, source: io::Error },

    #[error("failed to create temporary directory under '{root}': {source}")]
    TempRoot { root: PathBuf, source: io::Error },

    #[error("failed to remove '{path}': {source}")]
    Remove { path: PathBuf, source: io::Error },

    #[error("destination '{0}' exists but is a directory")]
    DestinationIsDirectory(PathBuf),

    #[error("failed to copy full contents into '{path}': expected {expected} bytes, wrote {actual}")]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Maps an I/O failure on `path` to `NotFound` or `Read`.
pub fn read_error(path: impl Into<PathBuf>, source: io::Error) -> Error {
    let path = path.into();
    match source.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path),
        _ => Error::Read { path, source },
    }
}
