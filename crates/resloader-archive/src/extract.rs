//! Materializing entries of (possibly nested) archives onto disk.
//!
//! A single file entry is streamed to `destination/<base name>`. A directory
//! entry, or the empty path for the archive root, is recreated under
//! `destination` with the requested prefix stripped, so the returned
//! directory mirrors the subtree. Nested archives are resolved one hop at a
//! time: the hop's archive is itself materialized as a plain file into a
//! staging directory and reopened for the next hop.

use std::io::Read;
use std::path::{Path, PathBuf};

use resloader_fs::StreamError;

use crate::error::{Error, Result};
use crate::options::ExtractOptions;
use crate::path::{NestedPath, ResourcePath};
use crate::sanitize::resolve_under;
use crate::source::{EntryMeta, Visit, ZipSource};

/// Whether an extracted resource is a single file or a directory tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Directory,
}

/// Absolute location of a resource after extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedResource {
    path: PathBuf,
    kind: ResourceKind,
}

impl ExtractedResource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ResourceKind::File,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ResourceKind::Directory,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ResourceKind::Directory
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

#[derive(Clone, Debug, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Materializes `entry` of the archive at `archive` into `destination`.
    ///
    /// `entry` may cross nested-archive boundaries, e.g. `inner.jar/data.bin`.
    pub fn materialize(&self, archive: &Path, entry: &str, destination: &Path) -> Result<ExtractedResource> {
        let path = ResourcePath::parse(entry)?;
        let nested = NestedPath::split(&path, &self.options);
        self.materialize_nested(archive, &nested, destination)
    }

    /// Like [`materialize`](Self::materialize) with an already decomposed path.
    pub fn materialize_nested(
        &self,
        archive: &Path,
        nested: &NestedPath,
        destination: &Path,
    ) -> Result<ExtractedResource> {
        if nested.depth() > self.options.max_depth {
            return Err(Error::NestingTooDeep {
                depth: nested.depth(),
                limit: self.options.max_depth,
            });
        }
        tracing::debug!(
            archive = %archive.display(),
            entry = %nested,
            destination = %destination.display(),
            "materializing archive entry"
        );
        self.resolve(archive, nested.archives(), nested.entry(), destination)
    }

    fn resolve(&self, archive: &Path, hops: &[String], entry: &str, destination: &Path) -> Result<ExtractedResource> {
        let Some((hop, rest)) = hops.split_first() else {
            return self.extract_entry(archive, entry, destination);
        };

        let staging = tempfile::Builder::new()
            .prefix("resloader-hop-")
            .tempdir()
            .map_err(|source| Error::Staging { source })?;
        let inner = self.extract_entry(archive, hop, staging.path())?;
        if !inner.is_file() {
            return Err(Error::NotAnArchive {
                archive: archive.to_path_buf(),
                entry: hop.clone(),
            });
        }
        tracing::debug!(archive = %archive.display(), nested = %hop, "opened nested archive");
        // `staging` lives until the inner hops are done with the materialized archive.
        self.resolve(inner.path(), rest, entry, destination)
    }

    fn extract_entry(&self, archive: &Path, entry: &str, destination: &Path) -> Result<ExtractedResource> {
        let mut source = ZipSource::open(archive)?;
        let mut buffer = self.options.buffer();
        let mut created = Created::default();
        created.dir(destination)?;

        let entry = entry.trim_matches('/');
        if entry.is_empty() {
            extract_tree(&mut source, "", destination, &mut buffer, &mut created)?;
            created.commit();
            return Ok(ExtractedResource::directory(destination));
        }

        let prefix = format!("{entry}/");
        let file_name = entry.rsplit('/').next().unwrap_or(entry);
        let mut extracted = None;
        let mut found_dir = false;

        source.visit(|meta, reader| {
            if meta.name == entry && !meta.is_dir {
                let target = destination.join(file_name);
                write_file(archive, meta, reader, &target, &mut buffer)?;
                created.file(&target);
                extracted = Some(ExtractedResource::file(target));
                return Ok(Visit::Stop);
            }
            if let Some(relative) = meta.name.strip_prefix(&prefix) {
                found_dir = true;
                write_tree_entry(archive, meta, relative, reader, destination, &mut buffer, &mut created)?;
            }
            Ok(Visit::Continue)
        })?;

        let result = match extracted {
            Some(file) => file,
            None if found_dir => ExtractedResource::directory(destination),
            None => {
                return Err(Error::EntryNotFound {
                    archive: archive.to_path_buf(),
                    entry: entry.to_owned(),
                });
            }
        };
        created.commit();
        Ok(result)
    }
}

/// Files and directories written by one extraction. Unless committed they
/// are removed again on drop, newest first.
#[derive(Debug, Default)]
struct Created {
    paths: Vec<PathBuf>,
    committed: bool,
}

impl Created {
    /// Creates `path` and any missing parents, remembering the new ones.
    fn dir(&mut self, path: &Path) -> Result<()> {
        let missing: Vec<PathBuf> = path
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        resloader_fs::copy::create_dir_all(path)?;
        self.paths.extend(missing.into_iter().rev());
        Ok(())
    }

    fn file(&mut self, path: &Path) {
        self.paths.push(path.to_path_buf());
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for Created {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in self.paths.iter().rev() {
            if let Err(e) = resloader_fs::remove_path(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove partial extraction");
            }
        }
    }
}

fn extract_tree<R: Read + std::io::Seek>(
    source: &mut ZipSource<R>,
    prefix: &str,
    destination: &Path,
    buffer: &mut [u8],
    created: &mut Created,
) -> Result<()> {
    let archive = source.label().to_path_buf();
    source.visit(|meta, reader| {
        if let Some(relative) = meta.name.strip_prefix(prefix) {
            write_tree_entry(&archive, meta, relative, reader, destination, buffer, created)?;
        }
        Ok(Visit::Continue)
    })
}

fn write_tree_entry(
    archive: &Path,
    meta: &EntryMeta,
    relative: &str,
    reader: &mut dyn Read,
    destination: &Path,
    buffer: &mut [u8],
    created: &mut Created,
) -> Result<()> {
    if relative.trim_matches('/').is_empty() {
        return Ok(());
    }
    let target = resolve_under(destination, relative)?;
    if meta.is_dir {
        return created.dir(&target);
    }
    if let Some(parent) = target.parent() {
        created.dir(parent)?;
    }
    write_file(archive, meta, reader, &target, buffer)?;
    created.file(&target);
    Ok(())
}

fn write_file(
    archive: &Path,
    meta: &EntryMeta,
    reader: &mut dyn Read,
    target: &Path,
    buffer: &mut [u8],
) -> Result<()> {
    resloader_fs::stream_to_file(reader, target, buffer).map_err(|e| match e {
        StreamError::Source(source) => Error::CorruptedEntry {
            archive: archive.to_path_buf(),
            entry: meta.name.clone(),
            source,
        },
        StreamError::Fs(e) => Error::Fs(e),
    })?;
    Ok(())
}
