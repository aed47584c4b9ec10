//! Where the running code was loaded from.
//!
//! A code location is either a packaged archive (possibly nested inside
//! other archives) or a plain directory of loose files. Locations are given
//! as URL-like strings such as `file:/app/app.jar`,
//! `jar:file:/app/app.jar!/BOOT-INF/lib/inner.jar!/` or a bare filesystem
//! path.

use std::fmt;
use std::path::{Path, PathBuf};

use resloader_archive::{ExtractOptions, NestedPath, ResourcePath, ZipSource};

/// Reports the location the process's own code was loaded from.
pub trait CodeSource: fmt::Debug + Send + Sync {
    /// `None` when the location cannot be determined.
    fn location(&self) -> Option<String>;
}

/// A fixed location, e.g. injected by the embedding application or a test.
#[derive(Clone, Debug)]
pub struct StaticCodeSource(String);

impl StaticCodeSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }
}

impl CodeSource for StaticCodeSource {
    fn location(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// The running executable. It only counts as an archive when it carries a
/// zip payload; otherwise the `resources` directory next to it is used if
/// present.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutableCodeSource;

impl CodeSource for ExecutableCodeSource {
    fn location(&self) -> Option<String> {
        let exe = std::env::current_exe().ok()?;
        if ZipSource::open(&exe).is_ok() {
            return Some(exe.to_string_lossy().into_owned());
        }
        let resources = exe.parent()?.join("resources");
        resources
            .is_dir()
            .then(|| resources.to_string_lossy().into_owned())
    }
}

/// A parsed code location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodeLocation {
    /// Code packaged in `archive`. `inner` holds the chain of nested archives
    /// the code lives in, and its entry is a directory prefix inside the
    /// innermost one (usually empty).
    Archive { archive: PathBuf, inner: NestedPath },
    /// Loose files below a directory.
    Directory(PathBuf),
}

impl CodeLocation {
    /// Parses `raw` and checks it against the filesystem.
    ///
    /// Returns `None` when the location is malformed, does not exist, or
    /// names a file that is not an archive.
    pub fn parse(raw: &str, options: &ExtractOptions) -> Option<Self> {
        let path = to_file_path(raw)?;
        if path.is_dir() {
            return Some(Self::Directory(path));
        }

        let archive = path.ancestors().find(|a| a.is_file())?;
        if !is_archive(archive, options) {
            tracing::debug!(location = raw, "code location is not an archive");
            return None;
        }

        let remainder = path.strip_prefix(archive).ok()?;
        let remainder = remainder
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let remainder = ResourcePath::parse(&remainder).ok()?;
        let mut inner = NestedPath::split(&remainder, options);
        if options.is_archive_name(inner.entry()) {
            let mut archives = inner.archives().to_vec();
            archives.push(inner.entry().to_owned());
            inner = NestedPath::new(archives, "");
        }

        Some(Self::Archive {
            archive: archive.to_path_buf(),
            inner,
        })
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive { .. })
    }
}

/// Turns a `jar:`/`file:` URL or a bare path into a filesystem path. Nested
/// `!/` separators become ordinary path separators.
fn to_file_path(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let raw = raw.strip_prefix("jar:").unwrap_or(raw);
    let flattened = raw.replace("!/", "/");
    let flattened = flattened.strip_suffix('!').unwrap_or(&flattened);

    if flattened.starts_with("file:") {
        let url = url::Url::parse(flattened).ok()?;
        let path = url.to_file_path().ok()?;
        return Some(trim_trailing_separator(path));
    }
    Some(trim_trailing_separator(PathBuf::from(flattened)))
}

fn trim_trailing_separator(path: PathBuf) -> PathBuf {
    path.components().collect()
}

fn is_archive(path: &Path, options: &ExtractOptions) -> bool {
    let named = path
        .file_name()
        .map(|n| options.is_archive_name(&n.to_string_lossy()))
        .unwrap_or(false);
    named || ZipSource::open(path).is_ok()
}
