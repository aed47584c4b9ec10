//! Decides where a resource comes from and materializes it into a fresh
//! temporary directory. No caching happens here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use resloader_archive::{ExtractedResource, Extractor, NestedPath, ResourcePath};
use resloader_fs::TempWorkspace;

use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::source::{CodeLocation, CodeSource};

#[derive(Debug)]
pub struct ResourceLocator {
    code_source: Arc<dyn CodeSource>,
    resource_root: PathBuf,
    extractor: Extractor,
    workspace: Arc<TempWorkspace>,
    location: OnceCell<CodeLocation>,
}

impl ResourceLocator {
    pub fn new(config: &LoaderConfig, workspace: Arc<TempWorkspace>) -> Self {
        Self {
            code_source: Arc::clone(&config.code_source),
            resource_root: config.resource_root.clone(),
            extractor: Extractor::new(config.extract.clone()),
            workspace,
            location: OnceCell::new(),
        }
    }

    /// Where the code is running from, determined on first use. Anything
    /// inconclusive falls back to the configured loose resource root.
    pub fn code_location(&self) -> &CodeLocation {
        self.location.get_or_init(|| {
            let location = self
                .code_source
                .location()
                .and_then(|raw| CodeLocation::parse(&raw, self.extractor.options()))
                .unwrap_or_else(|| CodeLocation::Directory(self.resource_root.clone()));
            tracing::debug!(?location, "determined code location");
            location
        })
    }

    /// Materializes `path` into a fresh temporary directory.
    pub fn locate(&self, path: &str) -> Result<ExtractedResource> {
        self.locate_into(path, None)
    }

    /// Like [`locate`](Self::locate), nesting the result one level under
    /// `output_folder` inside the fresh directory.
    pub fn locate_into(&self, path: &str, output_folder: Option<&str>) -> Result<ExtractedResource> {
        let resource = ResourcePath::parse(path).map_err(|_| Error::InvalidPath(path.to_owned()))?;
        let folder = output_folder
            .map(|folder| ResourcePath::parse(folder).map_err(|_| Error::InvalidPath(folder.to_owned())))
            .transpose()?;

        let dir = self.workspace.create_dir()?;
        let destination = match &folder {
            Some(folder) => dir.join(folder.relative()),
            None => dir.clone(),
        };

        let located = match self.code_location() {
            CodeLocation::Archive { archive, inner } => self.from_archive(archive, inner, &resource, &destination),
            CodeLocation::Directory(root) => self.from_directory(root, &resource, &destination),
        };
        if located.is_err() {
            if let Err(e) = self.workspace.discard_dir(&dir) {
                tracing::warn!(path = %dir.display(), error = %e, "failed to discard extraction directory");
            }
        }
        located
    }

    fn from_archive(
        &self,
        archive: &Path,
        inner: &NestedPath,
        resource: &ResourcePath,
        destination: &Path,
    ) -> Result<ExtractedResource> {
        let full = match inner.entry() {
            "" => resource.clone(),
            prefix => ResourcePath::parse(&format!("{prefix}/{}", resource.relative()))
                .map_err(|_| Error::InvalidPath(resource.to_string()))?,
        };
        let nested = NestedPath::split(&full, self.extractor.options()).within(inner.archives());
        tracing::debug!(archive = %archive.display(), resource = %nested, "locating packaged resource");
        Ok(self.extractor.materialize_nested(archive, &nested, destination)?)
    }

    fn from_directory(&self, root: &Path, resource: &ResourcePath, destination: &Path) -> Result<ExtractedResource> {
        // A loose archive file on the way, e.g. `libs/inner.jar/data.bin`.
        let nested = NestedPath::split(resource, self.extractor.options());
        if let Some((first, rest)) = nested.archives().split_first() {
            let archive = root.join(first);
            if archive.is_file() {
                tracing::debug!(archive = %archive.display(), resource = %nested, "locating resource in loose archive");
                let inner = NestedPath::new(rest.to_vec(), nested.entry());
                return Ok(self.extractor.materialize_nested(&archive, &inner, destination)?);
            }
        }

        let source = if resource.is_root() {
            root.to_path_buf()
        } else {
            root.join(resource.relative())
        };
        tracing::debug!(source = %source.display(), "locating loose resource");

        let metadata = std::fs::metadata(&source).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(resource.to_string()),
            _ => Error::Fs(resloader_fs::read_error(&source, e)),
        })?;
        let mut buffer = vec![0u8; self.extractor.options().chunk_size.max(1)];
        resloader_fs::copy::create_dir_all(destination)?;

        if metadata.is_file() {
            let name = resource.file_name().unwrap_or("resource");
            let target = destination.join(name);
            resloader_fs::copy_file(&source, &target, &mut buffer)?;
            Ok(ExtractedResource::file(target))
        } else {
            resloader_fs::copy_dir_all(&source, destination, &mut buffer)?;
            Ok(ExtractedResource::directory(destination))
        }
    }
}
