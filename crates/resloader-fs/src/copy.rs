//! Chunked copies that never leave half-written files behind.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::read_error;
use crate::{Error, Result};

/// Default size of the reusable copy buffer.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Failure while streaming into a file: either the source or the destination side.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("source read failed: {0}")]
    Source(#[source] io::Error),

    #[error(transparent)]
    Fs(#[from] Error),
}

/// A destination file that is removed again unless committed.
#[derive(Debug)]
pub struct PartialFile {
    path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl PartialFile {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.is_dir() {
            return Err(Error::DestinationIsDirectory(path));
        }
        let file = File::create(&path).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            file: Some(file),
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(Error::Write {
                path: self.path.clone(),
                source: io::Error::other("file already closed"),
            });
        };
        file.write_all(bytes).map_err(|source| Error::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn commit(mut self) -> Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|source| Error::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        self.committed = true;
        Ok(std::mem::take(&mut self.path))
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Close first; open handles block removal on some platforms.
        drop(self.file.take());
        discard_file(&self.path);
    }
}

/// Best-effort removal of an incomplete file. Failures are logged, not returned.
fn discard_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove partial file");
        }
    }
}

/// Streams `reader` into a new file at `destination` through `buffer`.
///
/// The buffer is reused for every chunk, so memory use is bounded by its
/// length regardless of the source size. On any failure the partially
/// written destination is removed before the error is returned.
pub fn stream_to_file<R: Read + ?Sized>(
    reader: &mut R,
    destination: &Path,
    buffer: &mut [u8],
) -> std::result::Result<u64, StreamError> {
    debug_assert!(!buffer.is_empty(), "copy buffer must not be empty");
    let mut partial = PartialFile::create(destination)?;
    let mut written = 0u64;

    loop {
        let n = match reader.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::Source(e)),
        };
        partial.write_all(&buffer[..n])?;
        written += n as u64;
    }

    partial.commit()?;
    Ok(written)
}

/// Copies a single file, verifying the full length arrived.
pub fn copy_file(src: &Path, dest: &Path, buffer: &mut [u8]) -> Result<u64> {
    let mut input = File::open(src).map_err(|e| read_error(src, e))?;
    let expected = input.metadata().map_err(|e| read_error(src, e))?.len();

    let written = stream_to_file(&mut input, dest, buffer).map_err(|e| match e {
        StreamError::Source(source) => Error::Read {
            path: src.to_path_buf(),
            source,
        },
        StreamError::Fs(e) => e,
    })?;

    if written != expected {
        discard_file(dest);
        return Err(Error::Truncated {
            path: dest.to_path_buf(),
            expected,
            actual: written,
        });
    }
    Ok(written)
}

/// Recursively copies `src` into `dest`, creating `dest` if needed.
///
/// Symlinks are followed. When `dest` lies inside `src` it is skipped so the
/// copy never recurses into itself.
pub fn copy_dir_all(src: impl AsRef<Path>, dest: impl AsRef<Path>, buffer: &mut [u8]) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    create_dir_all(dest)?;
    let src_canonical = src.canonicalize().map_err(|e| read_error(src, e))?;
    let excluded = dest
        .canonicalize()
        .ok()
        .filter(|d| d.starts_with(&src_canonical) && *d != src_canonical);

    copy_tree(src, dest, excluded.as_deref(), buffer)
}

fn copy_tree(src: &Path, dest: &Path, excluded: Option<&Path>, buffer: &mut [u8]) -> Result<()> {
    create_dir_all(dest)?;

    for entry in fs::read_dir(src).map_err(|e| read_error(src, e))? {
        let entry = entry.map_err(|source| Error::Read {
            path: src.to_path_buf(),
            source,
        })?;
        let src_path = entry.path();

        if let Some(excluded) = excluded {
            if src_path.canonicalize().is_ok_and(|p| p == excluded) {
                continue;
            }
        }

        let dest_path = dest.join(entry.file_name());
        let metadata = fs::metadata(&src_path).map_err(|e| read_error(&src_path, e))?;
        if metadata.is_dir() {
            copy_tree(&src_path, &dest_path, excluded, buffer)?;
        } else {
            copy_file(&src_path, &dest_path, buffer)?;
        }
    }
    Ok(())
}

/// `fs::create_dir_all` with the path attached to the error.
pub fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}
