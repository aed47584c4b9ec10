//! Logical resource paths and their decomposition at archive boundaries.

use std::fmt;

use crate::error::{Error, Result};
use crate::options::ExtractOptions;

/// Forward-slash path relative to the resource root.
///
/// Always starts with `/` and never climbs above the root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Normalizes separators, drops `.` and empty segments and resolves `..`.
    ///
    /// # Errors
    /// [`Error::InvalidPath`] if `..` would escape the root or the path has a NUL byte.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.contains('\0') {
            return Err(Error::InvalidPath { path: raw.to_owned() });
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(Error::InvalidPath { path: raw.to_owned() });
                    }
                }
                other => segments.push(other),
            }
        }
        Ok(Self(format!("/{}", segments.join("/"))))
    }

    pub fn root() -> Self {
        Self("/".to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path without its leading separator, as stored in archives.
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.relative().split('/').filter(|s| !s.is_empty())
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resource path split into the chain of archives it passes through.
///
/// `outer.jar/inner.jar/data.bin` resolved against the outer archive becomes
/// archives `["inner.jar"]` and entry `data.bin`: open `inner.jar` inside the
/// outer archive, then read `data.bin` from it. The final segment is never a
/// boundary, so `inner.jar` alone targets the nested archive file itself. An
/// empty entry means the whole innermost archive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NestedPath {
    archives: Vec<String>,
    entry: String,
}

/// One step of a [`NestedPath`]: an archive and what remains to resolve in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hop<'a> {
    pub archive: &'a str,
    pub remaining: String,
}

impl NestedPath {
    pub fn new(archives: Vec<String>, entry: impl Into<String>) -> Self {
        Self {
            archives,
            entry: entry.into(),
        }
    }

    /// Splits `path` after every non-final segment that names an archive.
    pub fn split(path: &ResourcePath, options: &ExtractOptions) -> Self {
        let segments: Vec<&str> = path.segments().collect();
        let mut archives = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            current.push(segment);
            let last = i + 1 == segments.len();
            if !last && options.is_archive_name(segment) {
                archives.push(current.join("/"));
                current.clear();
            }
        }

        Self {
            archives,
            entry: current.join("/"),
        }
    }

    /// Prepends archive hops, e.g. the chain leading to the code's own archive.
    pub fn within(mut self, outer: &[String]) -> Self {
        let mut archives = outer.to_vec();
        archives.append(&mut self.archives);
        self.archives = archives;
        self
    }

    pub fn archives(&self) -> &[String] {
        &self.archives
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Number of archive boundaries crossed.
    pub fn depth(&self) -> usize {
        self.archives.len()
    }

    /// The `(archive, remaining-path)` pairs, outermost nested archive first.
    pub fn hops(&self) -> Vec<Hop<'_>> {
        (0..self.archives.len())
            .map(|i| {
                let mut rest: Vec<&str> = self.archives[i + 1..].iter().map(String::as_str).collect();
                if !self.entry.is_empty() {
                    rest.push(&self.entry);
                }
                Hop {
                    archive: &self.archives[i],
                    remaining: rest.join("/"),
                }
            })
            .collect()
    }
}

impl fmt::Display for NestedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = self.archives.iter().map(String::as_str).collect();
        if !self.entry.is_empty() {
            parts.push(&self.entry);
        }
        write!(f, "/{}", parts.join("/"))
    }
}
