//! Filesystem primitives for materialized resources.
//!
//! - `permissions.rs` - Canonical permission sets and per-platform application
//! - `workspace.rs` - Process-scoped temporary directories
//! - `lifetime.rs` - Immediate vs deferred deletion of handed-out files
//! - `copy.rs` - Chunked copies with partial-write cleanup

pub use copy::{DEFAULT_CHUNK_SIZE, PartialFile, StreamError, copy_dir_all, copy_file, stream_to_file};
pub use error::{Error, Result, read_error};
pub use lifetime::{DeletionStrategy, Release, remove_path};
pub use permissions::{CoarseGrant, PermissionModel, PermissionPolicy, PermissionSet};
pub use workspace::{DEFAULT_PREFIX, TempWorkspace};

pub mod copy;
mod error;
pub mod lifetime;
pub mod permissions;
mod workspace;
