use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Resolves an archive entry name below `base`, rejecting zip-slip escapes.
pub fn resolve_under(base: &Path, entry: &str) -> Result<PathBuf> {
    let relative = Path::new(entry);
    let mut resolved = base.to_path_buf();

    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if resolved == base || !resolved.pop() {
                    return Err(zip_slip(entry, base.join(relative)));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(zip_slip(entry, relative.to_path_buf()));
            }
        }
    }

    if !resolved.starts_with(base) {
        return Err(zip_slip(entry, resolved));
    }
    Ok(resolved)
}

fn zip_slip(entry: &str, resolved: PathBuf) -> Error {
    Error::ZipSlip {
        entry: entry.to_owned(),
        resolved,
    }
}
