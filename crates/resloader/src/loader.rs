//! The explicit per-process resource context.

use std::path::Path;
use std::sync::Arc;

use resloader_archive::ExtractedResource;
use resloader_fs::{PermissionPolicy, PermissionSet, Release, TempWorkspace};

use crate::cache::ResourceCache;
use crate::config::LoaderConfig;
use crate::error::Result;
use crate::locator::ResourceLocator;

/// Owns the temporary workspace, the extraction cache and the permission
/// policy. Construct one per process (or per test) and share it by reference
/// or through an `Arc`. Deferred deletions and the temp root are cleaned up
/// when it is dropped.
#[derive(Debug)]
pub struct ResourceLoader {
    workspace: Arc<TempWorkspace>,
    locator: ResourceLocator,
    cache: ResourceCache,
    policy: PermissionPolicy,
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl ResourceLoader {
    pub fn new(config: LoaderConfig) -> Self {
        let mut workspace = TempWorkspace::new(config.temp_prefix.clone()).deletion_strategy(config.deletion);
        if let Some(parent) = &config.temp_parent {
            workspace = workspace.in_dir(parent);
        }
        let workspace = Arc::new(workspace);
        Self {
            locator: ResourceLocator::new(&config, Arc::clone(&workspace)),
            workspace,
            cache: ResourceCache::new(),
            policy: PermissionPolicy::new(config.permission_model),
        }
    }

    /// Extracts `path` into a fresh temporary directory, bypassing the cache.
    pub fn copy_to_temp(&self, path: &str) -> Result<ExtractedResource> {
        self.locator.locate(path)
    }

    /// Extracts `path` once per process and returns the same location on
    /// every later call.
    pub fn resolve(&self, path: &str) -> Result<ExtractedResource> {
        self.cache.get_or_load(path, || self.locator.locate(path))
    }

    /// Resolves `path` and grants full access to it.
    pub fn load(&self, path: &str) -> Result<ExtractedResource> {
        self.load_with(path, PermissionSet::EMPTY)
    }

    /// Resolves `path` and applies `permissions`; the empty set means full access.
    pub fn load_with(&self, path: &str, permissions: PermissionSet) -> Result<ExtractedResource> {
        let resource = self.resolve(path)?;
        self.set_permissions(resource.path(), permissions)?;
        Ok(resource)
    }

    /// Like [`load_with`](Self::load_with), placing the result under
    /// `output_folder` inside its temporary directory.
    ///
    /// Cached separately per output folder.
    pub fn load_into(
        &self,
        path: &str,
        output_folder: &str,
        permissions: PermissionSet,
    ) -> Result<ExtractedResource> {
        let key = format!("{output_folder}:{path}");
        let resource = self
            .cache
            .get_or_load(&key, || self.locator.locate_into(path, Some(output_folder)))?;
        self.set_permissions(resource.path(), permissions)?;
        Ok(resource)
    }

    pub fn set_permissions<'a>(&self, target: &'a Path, permissions: PermissionSet) -> Result<&'a Path> {
        Ok(self.policy.apply(target, permissions)?)
    }

    /// Releases a handed-out resource per the deletion strategy. After an
    /// immediate removal the cache forgets `key` so it is extracted again on
    /// the next request.
    pub fn request_deletion(&self, key: &str, resource: &ExtractedResource) -> Result<Release> {
        let release = self.workspace.release(resource.path())?;
        if release == Release::Removed {
            self.cache.invalidate(key);
        }
        Ok(release)
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn workspace(&self) -> &TempWorkspace {
        &self.workspace
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }
}
