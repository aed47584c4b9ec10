//! Load modes and fallback plans.

use std::fmt;

/// One way of obtaining a native library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadMode {
    /// Load by name from the operating system's library search path.
    System { library: String },
    /// Extract from the bundled resources, then load the extracted file.
    Bundled { path: String },
}

impl LoadMode {
    pub fn system(library: impl Into<String>) -> Self {
        Self::System { library: library.into() }
    }

    pub fn bundled(path: impl Into<String>) -> Self {
        Self::Bundled { path: path.into() }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System { library } => write!(f, "system library '{library}'"),
            Self::Bundled { path } => write!(f, "bundled resource '{path}'"),
        }
    }
}

/// Common fallback plans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Try the system install first, then the bundled copy.
    #[default]
    PreferSystem,
    BundledOnly,
    SystemOnly,
}

impl Mode {
    /// Expands the preset into an ordered plan.
    pub fn plan(self, library: &str, bundled_path: &str) -> Vec<LoadMode> {
        match self {
            Self::PreferSystem => vec![LoadMode::system(library), LoadMode::bundled(bundled_path)],
            Self::BundledOnly => vec![LoadMode::bundled(bundled_path)],
            Self::SystemOnly => vec![LoadMode::system(library)],
        }
    }
}
