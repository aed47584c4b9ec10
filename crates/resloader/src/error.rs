use std::fmt;
use std::path::PathBuf;

use crate::mode::LoadMode;

/// Failure reported by a [`Registrar`](crate::Registrar) when it cannot bind a library.
pub type RegisterError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid resource path '{0}'")]
    InvalidPath(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("'{0}' is a directory; supply a file path, not a directory")]
    NotAFile(PathBuf),

    #[error(transparent)]
    Fs(#[from] resloader_fs::Error),

    #[error(transparent)]
    Archive(#[from] resloader_archive::Error),

    #[error("failed to register library '{library}': {source}")]
    Link { library: String, source: RegisterError },

    #[error("could not load the library from any configured source ({} attempts)", .failures.len())]
    Exhausted { failures: Vec<ModeFailure> },
}

impl Error {
    /// Number of load modes tried before giving up. Zero for anything but [`Error::Exhausted`].
    pub fn attempts(&self) -> usize {
        match self {
            Self::Exhausted { failures } => failures.len(),
            _ => 0,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Fs(e) => matches!(e, resloader_fs::Error::NotFound(_)),
            Self::Archive(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// One failed step of a load plan.
#[derive(Debug)]
pub struct ModeFailure {
    pub mode: LoadMode,
    pub error: Box<Error>,
}

impl fmt::Display for ModeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.mode, self.error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
