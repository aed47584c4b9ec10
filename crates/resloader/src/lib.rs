//! Bundled resource extraction and native library loading.
//!
//! Resources shipped inside the application's package (including archives
//! nested in other archives) or next to it as loose files are materialized
//! into a process-scoped temporary directory, once per path. Native
//! libraries are then loaded by trying an ordered plan of modes: the system
//! library search path, or a bundled copy.
//!
//! - `source.rs` - Where the running code lives
//! - `locator.rs` - Archive vs loose-file materialization
//! - `cache.rs` - Once-per-path extraction
//! - `loader.rs` - The per-process context owning workspace, cache and policy
//! - `mode.rs` - Load modes and presets
//! - `library.rs` - The fallback protocol and registration

pub use cache::ResourceCache;
pub use config::{DEFAULT_RESOURCE_ROOT, LoaderConfig};
pub use error::{Error, ModeFailure, RegisterError, Result};
pub use library::{LibraryLoader, Loaded, Registrar};
pub use loader::ResourceLoader;
pub use locator::ResourceLocator;
pub use mode::{LoadMode, Mode};
pub use source::{CodeLocation, CodeSource, ExecutableCodeSource, StaticCodeSource};

pub use resloader_archive::{ExtractOptions, ExtractedResource, ResourceKind};
pub use resloader_fs::{DeletionStrategy, PermissionModel, PermissionSet, Release};

mod cache;
mod config;
mod error;
mod library;
mod loader;
mod locator;
mod mode;
mod source;
