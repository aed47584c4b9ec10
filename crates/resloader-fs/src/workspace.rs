use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use once_cell::sync::OnceCell;
use tempfile::TempDir;

use crate::lifetime::{DeletionStrategy, Release, remove_path};
use crate::{Error, Result};

/// Prefix of every process root, so the directories are recognizable in the temp dir.
pub const DEFAULT_PREFIX: &str = "resource-loader";

/// Process-scoped temporary directory tree.
///
/// One root directory is created lazily under the platform temp dir (or a
/// configured parent). Each [`create_dir`](Self::create_dir) call hands out a
/// fresh, never reused subdirectory inside it. Everything, including deferred
/// deletions, is removed on a best-effort basis when the workspace is dropped.
#[derive(Debug)]
pub struct TempWorkspace {
    prefix: String,
    parent: Option<PathBuf>,
    strategy: DeletionStrategy,
    deferred: Mutex<Vec<PathBuf>>,
    dirs: Mutex<Vec<TempDir>>,
    root: OnceCell<TempDir>,
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl TempWorkspace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            parent: None,
            strategy: DeletionStrategy::detect(),
            deferred: Mutex::new(Vec::new()),
            dirs: Mutex::new(Vec::new()),
            root: OnceCell::new(),
        }
    }

    /// Places the process root under `parent` instead of the platform temp dir.
    pub fn in_dir(mut self, parent: impl Into<PathBuf>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn deletion_strategy(mut self, strategy: DeletionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> DeletionStrategy {
        self.strategy
    }

    /// The process root, created on first use.
    pub fn root(&self) -> Result<&Path> {
        let root = self.root.get_or_try_init(|| {
            let mut builder = tempfile::Builder::new();
            builder.prefix(&self.prefix);
            let created = match &self.parent {
                Some(parent) => builder.tempdir_in(parent),
                None => builder.tempdir(),
            };
            let dir = created.map_err(|source| Error::TempRoot {
                root: self.parent.clone().unwrap_or_else(std::env::temp_dir),
                source,
            })?;
            tracing::debug!(root = %dir.path().display(), "created temporary root");
            Ok::<_, Error>(dir)
        })?;
        Ok(root.path())
    }

    /// Creates a fresh, uniquely named directory inside the process root.
    pub fn create_dir(&self) -> Result<PathBuf> {
        let root = self.root()?;
        let dir = tempfile::Builder::new()
            .prefix("extract-")
            .tempdir_in(root)
            .map_err(|source| Error::TempRoot {
                root: root.to_path_buf(),
                source,
            })?;
        let path = dir.path().to_path_buf();
        self.dirs.lock().unwrap_or_else(PoisonError::into_inner).push(dir);
        Ok(path)
    }

    /// Removes a directory handed out by [`create_dir`](Self::create_dir)
    /// right away, e.g. after the extraction into it failed.
    pub fn discard_dir(&self, path: &Path) -> Result<()> {
        let dir = {
            let mut dirs = self.dirs.lock().unwrap_or_else(PoisonError::into_inner);
            let index = dirs.iter().position(|d| d.path() == path);
            index.map(|i| dirs.swap_remove(i))
        };
        match dir {
            Some(dir) => dir.close().map_err(|source| Error::Remove {
                path: path.to_path_buf(),
                source,
            }),
            None => remove_path(path),
        }
    }

    /// Deletes `path` now or at drop, depending on the deletion strategy.
    pub fn release(&self, path: &Path) -> Result<Release> {
        match self.strategy {
            DeletionStrategy::Immediate => {
                remove_path(path)?;
                tracing::debug!(path = %path.display(), "removed extracted resource");
                Ok(Release::Removed)
            }
            DeletionStrategy::DeferToExit => {
                self.deferred
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(path.to_path_buf());
                tracing::debug!(path = %path.display(), "deferred removal of extracted resource");
                Ok(Release::Deferred)
            }
        }
    }

    /// Paths waiting for removal at drop.
    pub fn deferred(&self) -> Vec<PathBuf> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        let deferred = std::mem::take(self.deferred.get_mut().unwrap_or_else(PoisonError::into_inner));
        for path in deferred {
            if let Err(e) = remove_path(&path) {
                tracing::warn!(path = %path.display(), error = %e, "best-effort cleanup failed");
            }
        }
        // `dirs` and then `root` drop afterwards and remove their trees.
    }
}
