use std::path::PathBuf;
use std::sync::Arc;

use resloader_archive::ExtractOptions;
use resloader_fs::{DEFAULT_PREFIX, DeletionStrategy, PermissionModel};

use crate::source::{CodeSource, ExecutableCodeSource};

/// Directory loose resources are read from when the code is not packaged.
pub const DEFAULT_RESOURCE_ROOT: &str = "resources";

/// Settings for a [`ResourceLoader`](crate::ResourceLoader).
///
/// Platform strategies are detected when the config is created and can be
/// overridden for tests or unusual platforms.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    pub temp_prefix: String,
    pub temp_parent: Option<PathBuf>,
    pub resource_root: PathBuf,
    pub permission_model: PermissionModel,
    pub deletion: DeletionStrategy,
    pub extract: ExtractOptions,
    pub code_source: Arc<dyn CodeSource>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            temp_prefix: DEFAULT_PREFIX.to_owned(),
            temp_parent: None,
            resource_root: PathBuf::from(DEFAULT_RESOURCE_ROOT),
            permission_model: PermissionModel::detect(),
            deletion: DeletionStrategy::detect(),
            extract: ExtractOptions::default(),
            code_source: Arc::new(ExecutableCodeSource),
        }
    }
}

impl LoaderConfig {
    pub fn temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    /// Creates the process temp root under `parent` instead of the platform temp dir.
    pub fn temp_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.temp_parent = Some(parent.into());
        self
    }

    /// Loose-file root used when the code location cannot be determined.
    pub fn resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }

    pub fn permission_model(mut self, model: PermissionModel) -> Self {
        self.permission_model = model;
        self
    }

    pub fn deletion(mut self, strategy: DeletionStrategy) -> Self {
        self.deletion = strategy;
        self
    }

    pub fn extract(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }

    pub fn code_source(mut self, source: impl CodeSource + 'static) -> Self {
        self.code_source = Arc::new(source);
        self
    }
}
