//! Ordered fallback loading of native libraries.
//!
//! A plan is a list of [`LoadMode`]s tried strictly in order. The first mode
//! that registers the library with every consumer wins; a failing mode is
//! logged and counted, never fatal on its own. Only a fully exhausted plan
//! is reported, as [`Error::Exhausted`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use resloader_fs::PermissionSet;

use crate::error::{Error, ModeFailure, RegisterError, Result};
use crate::loader::ResourceLoader;
use crate::mode::{LoadMode, Mode};

/// Binds a loaded native library to the code that calls into it.
///
/// `library` is either a bare name for the system search path or an
/// absolute path to an extracted file.
pub trait Registrar: Send + Sync {
    type Consumer: fmt::Debug;

    fn register(&self, consumer: &Self::Consumer, library: &str) -> std::result::Result<(), RegisterError>;
}

/// Which mode ended up providing the library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Loaded {
    System { library: String },
    Bundled { path: PathBuf },
}

impl Loaded {
    /// The extracted file, or `None` when the system copy was used.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::System { .. } => None,
            Self::Bundled { path } => Some(path),
        }
    }
}

pub struct LibraryLoader<R: Registrar> {
    resources: Arc<ResourceLoader>,
    registrar: R,
    // Serializes whole plans so consumers are never registered twice concurrently.
    lock: Mutex<()>,
}

impl<R: Registrar + fmt::Debug> fmt::Debug for LibraryLoader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryLoader")
            .field("resources", &self.resources)
            .field("registrar", &self.registrar)
            .finish_non_exhaustive()
    }
}

impl<R: Registrar> LibraryLoader<R> {
    pub fn new(resources: Arc<ResourceLoader>, registrar: R) -> Self {
        Self {
            resources,
            registrar,
            lock: Mutex::new(()),
        }
    }

    pub fn resources(&self) -> &ResourceLoader {
        &self.resources
    }

    pub fn registrar(&self) -> &R {
        &self.registrar
    }

    /// Runs `plan` in order until one mode succeeds.
    ///
    /// # Errors
    /// [`Error::Exhausted`] carrying every attempt's failure when no mode
    /// succeeds, including for an empty plan.
    pub fn load(&self, plan: &[LoadMode], consumers: &[R::Consumer]) -> Result<Loaded> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut failures = Vec::new();

        for mode in plan {
            tracing::debug!(%mode, attempt = failures.len() + 1, "attempting load mode");
            match self.attempt(mode, consumers) {
                Ok(loaded) => {
                    tracing::info!(%mode, "native library loaded");
                    return Ok(loaded);
                }
                Err(error) => {
                    tracing::warn!(%mode, %error, "load mode failed");
                    failures.push(ModeFailure {
                        mode: mode.clone(),
                        error: Box::new(error),
                    });
                }
            }
        }

        tracing::warn!(attempts = failures.len(), "all load modes failed");
        Err(Error::Exhausted { failures })
    }

    /// Expands a preset into a plan and runs it.
    pub fn load_preset(
        &self,
        mode: Mode,
        library: &str,
        bundled_path: &str,
        consumers: &[R::Consumer],
    ) -> Result<Loaded> {
        self.load(&mode.plan(library, bundled_path), consumers)
    }

    /// Registers the system library `library`, surfacing its error directly.
    pub fn load_system(&self, library: &str, consumers: &[R::Consumer]) -> Result<Loaded> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.system(library, consumers)
    }

    /// Extracts and registers the bundled file at `path`, surfacing its error directly.
    pub fn load_bundled(&self, path: &str, consumers: &[R::Consumer]) -> Result<Loaded> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.bundled(path, consumers)
    }

    fn attempt(&self, mode: &LoadMode, consumers: &[R::Consumer]) -> Result<Loaded> {
        match mode {
            LoadMode::System { library } => self.system(library, consumers),
            LoadMode::Bundled { path } => self.bundled(path, consumers),
        }
    }

    fn system(&self, library: &str, consumers: &[R::Consumer]) -> Result<Loaded> {
        self.register_all(library, consumers)?;
        Ok(Loaded::System {
            library: library.to_owned(),
        })
    }

    fn bundled(&self, path: &str, consumers: &[R::Consumer]) -> Result<Loaded> {
        let resource = self.resources.resolve(path)?;
        if !resource.is_file() {
            return Err(Error::NotAFile(resource.into_path()));
        }
        self.resources.set_permissions(resource.path(), PermissionSet::EMPTY)?;

        let absolute =
            std::path::absolute(resource.path()).map_err(|e| resloader_fs::read_error(resource.path(), e))?;
        self.register_all(&absolute.to_string_lossy(), consumers)?;

        // The library is loaded now; failing to clean up does not undo that.
        if let Err(e) = self.resources.request_deletion(path, &resource) {
            tracing::warn!(path = %absolute.display(), error = %e, "failed to release extracted library");
        }
        Ok(Loaded::Bundled { path: absolute })
    }

    fn register_all(&self, library: &str, consumers: &[R::Consumer]) -> Result<()> {
        for consumer in consumers {
            tracing::debug!(library, ?consumer, "registering library");
            self.registrar
                .register(consumer, library)
                .map_err(|source| Error::Link {
                    library: library.to_owned(),
                    source,
                })?;
        }
        Ok(())
    }
}
