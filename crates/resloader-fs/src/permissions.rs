use std::ops::{BitOr, BitOrAssign};
use std::path::Path;

use crate::{Error, Result};

/// Owner/group/other x read/write/execute bits.
///
/// The empty set is a sentinel: applying it grants full access to every class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PermissionSet(u32);

impl PermissionSet {
    pub const EMPTY: Self = Self(0);

    pub const OWNER_READ: Self = Self(0o400);
    pub const OWNER_WRITE: Self = Self(0o200);
    pub const OWNER_EXECUTE: Self = Self(0o100);
    pub const GROUP_READ: Self = Self(0o040);
    pub const GROUP_WRITE: Self = Self(0o020);
    pub const GROUP_EXECUTE: Self = Self(0o010);
    pub const OTHERS_READ: Self = Self(0o004);
    pub const OTHERS_WRITE: Self = Self(0o002);
    pub const OTHERS_EXECUTE: Self = Self(0o001);

    /// Read bit for every class.
    pub const READ: Self = Self(0o444);
    /// Write bit for every class.
    pub const WRITE: Self = Self(0o222);
    /// Execute bit for every class.
    pub const EXECUTE: Self = Self(0o111);
    /// Read, write and execute for owner, group and other.
    pub const FULL: Self = Self(0o777);

    /// Builds a set from Unix mode bits; anything above `0o777` is dropped.
    pub fn from_mode(mode: u32) -> Self {
        Self(mode & 0o777)
    }

    pub fn mode(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Substitutes [`PermissionSet::FULL`] for the empty sentinel.
    pub fn or_full(self) -> Self {
        if self.is_empty() { Self::FULL } else { self }
    }
}

impl BitOr for PermissionSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PermissionSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl FromIterator<PermissionSet> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionSet>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, BitOr::bitor)
    }
}

/// How the host filesystem expresses permissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionModel {
    /// Fine-grained owner/group/other bits.
    Posix,
    /// Global readable/writable/executable flags only.
    Coarse,
}

impl PermissionModel {
    pub fn detect() -> Self {
        if cfg!(unix) { Self::Posix } else { Self::Coarse }
    }
}

impl Default for PermissionModel {
    fn default() -> Self {
        Self::detect()
    }
}

/// The single global flag a coarse platform gets for a requested set.
///
/// Read wins over write, write wins over execute. Requesting read and
/// execute together yields only `Readable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoarseGrant {
    Readable,
    Writable,
    Executable,
}

impl CoarseGrant {
    pub fn for_set(set: PermissionSet) -> Self {
        if set.intersects(PermissionSet::READ) {
            Self::Readable
        } else if set.intersects(PermissionSet::WRITE) {
            Self::Writable
        } else {
            Self::Executable
        }
    }
}

/// Computes and applies the canonical permission set for a target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PermissionPolicy {
    model: PermissionModel,
}

impl PermissionPolicy {
    pub fn new(model: PermissionModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> PermissionModel {
        self.model
    }

    /// Applies `requested` (or full access, when empty) to `target`.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the target is missing and
    /// [`Error::Permissions`] if the platform refuses the change.
    pub fn apply<'a>(&self, target: &'a Path, requested: PermissionSet) -> Result<&'a Path> {
        let set = requested.or_full();
        match self.model {
            PermissionModel::Posix => apply_mode(target, set)?,
            PermissionModel::Coarse => apply_coarse(target, CoarseGrant::for_set(set))?,
        }
        tracing::debug!(path = %target.display(), mode = format_args!("{:o}", set.mode()), model = ?self.model, "applied permissions");
        Ok(target)
    }
}

fn metadata(target: &Path) -> Result<std::fs::Metadata> {
    std::fs::metadata(target).map_err(|e| crate::error::read_error(target, e))
}

fn set_permissions(target: &Path, permissions: std::fs::Permissions) -> Result<()> {
    std::fs::set_permissions(target, permissions).map_err(|source| Error::Permissions {
        path: target.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn apply_mode(target: &Path, set: PermissionSet) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    metadata(target)?;
    set_permissions(target, std::fs::Permissions::from_mode(set.mode()))
}

#[cfg(not(unix))]
fn apply_mode(target: &Path, set: PermissionSet) -> Result<()> {
    apply_coarse(target, CoarseGrant::for_set(set))
}

#[cfg(unix)]
fn apply_coarse(target: &Path, grant: CoarseGrant) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let current = metadata(target)?.permissions().mode();
    let added = match grant {
        CoarseGrant::Readable => PermissionSet::READ,
        CoarseGrant::Writable => PermissionSet::WRITE,
        CoarseGrant::Executable => PermissionSet::EXECUTE,
    };
    set_permissions(target, std::fs::Permissions::from_mode(current | added.mode()))
}

#[cfg(not(unix))]
fn apply_coarse(target: &Path, grant: CoarseGrant) -> Result<()> {
    let mut permissions = metadata(target)?.permissions();
    match grant {
        // Readability and executability are not separate attributes here.
        CoarseGrant::Readable | CoarseGrant::Executable => Ok(()),
        CoarseGrant::Writable => {
            permissions.set_readonly(false);
            set_permissions(target, permissions)
        }
    }
}
