use std::fs;
use std::io;
use std::path::Path;

use crate::{Error, Result};

/// When an extracted file may be deleted after it has been handed out.
///
/// POSIX keeps unlinked files alive while they are open or mapped, so they can
/// go immediately. Elsewhere open handles block deletion and removal waits
/// until the owning workspace is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeletionStrategy {
    Immediate,
    DeferToExit,
}

impl DeletionStrategy {
    pub fn detect() -> Self {
        if cfg!(unix) { Self::Immediate } else { Self::DeferToExit }
    }
}

impl Default for DeletionStrategy {
    fn default() -> Self {
        Self::detect()
    }
}

/// Outcome of a deletion request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    Removed,
    Deferred,
}

/// Removes a file or a whole directory tree. Missing paths are not an error.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(Error::Remove {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|source| Error::Remove {
        path: path.to_path_buf(),
        source,
    })
}
