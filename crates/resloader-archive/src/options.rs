use resloader_fs::DEFAULT_CHUNK_SIZE;

/// Archive nesting limit, so a malicious archive cannot recurse without bound.
pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    pub chunk_size: usize,
    pub archive_extensions: Vec<String>,
    pub max_depth: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            archive_extensions: vec![".jar".to_owned(), ".zip".to_owned()],
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ExtractOptions {
    /// Size of the reusable copy buffer. Zero is raised to one byte.
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Path-segment suffixes that mark a nested-archive boundary.
    pub fn archive_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.archive_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Whether a path segment names an archive, compared case-insensitively.
    pub fn is_archive_name(&self, segment: &str) -> bool {
        let lower = segment.to_ascii_lowercase();
        self.archive_extensions
            .iter()
            .any(|ext| lower.len() > ext.len() && lower.ends_with(&ext.to_ascii_lowercase()))
    }

    pub(crate) fn buffer(&self) -> Vec<u8> {
        vec![0u8; self.chunk_size.max(1)]
    }
}
