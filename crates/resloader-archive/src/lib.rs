//! Extraction of resources from (nested) zip and jar archives.
//!
//! - `path.rs` - Resource paths and their split at archive boundaries
//! - `source.rs` - Forward-only entry cursor over a zip archive
//! - `extract.rs` - Single-file and subtree materialization, nested hops
//! - `sanitize.rs` - Zip-slip protection for entry names
//! - `options.rs` - Chunk size, archive extensions and depth limit

pub use error::{Error, Result};
pub use extract::{ExtractedResource, Extractor, ResourceKind};
pub use options::{DEFAULT_MAX_DEPTH, ExtractOptions};
pub use path::{Hop, NestedPath, ResourcePath};
pub use sanitize::resolve_under;
pub use source::{EntryMeta, Visit, ZipSource};

mod error;
mod extract;
mod options;
mod path;
mod sanitize;
mod source;
