use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Metadata of the entry currently under the cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMeta {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Whether a visitor wants the cursor to keep moving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

/// Forward-only cursor over the entries of a zip archive.
///
/// Entries are visited strictly in archive order, one at a time; each
/// entry's data is only available while the visitor is running.
pub struct ZipSource<R: Read + Seek> {
    archive: zip::ZipArchive<R>,
    label: PathBuf,
}

impl ZipSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => Error::ArchiveNotFound(path.to_path_buf()),
            _ => Error::Open {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::new(BufReader::new(file), path)
    }
}

impl<R: Read + Seek> ZipSource<R> {
    pub fn new(reader: R, label: impl Into<PathBuf>) -> Result<Self> {
        let label = label.into();
        let archive = zip::ZipArchive::new(reader).map_err(|source| Error::Corrupted {
            archive: label.clone(),
            source,
        })?;
        Ok(Self { archive, label })
    }

    pub fn label(&self) -> &Path {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Runs `visitor` over each entry in order until it returns [`Visit::Stop`].
    pub fn visit<F>(&mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&EntryMeta, &mut dyn Read) -> Result<Visit>,
    {
        let label = &self.label;
        for index in 0..self.archive.len() {
            let mut file = self.archive.by_index(index).map_err(|source| Error::Corrupted {
                archive: label.clone(),
                source,
            })?;
            let meta = EntryMeta {
                name: file.name().to_owned(),
                is_dir: file.is_dir(),
                size: file.size(),
            };
            if visitor(&meta, &mut file)? == Visit::Stop {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use super::*;

    fn sample_zip() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        writer.add_directory("dir/", options).unwrap();
        writer.start_file("dir/a.txt", options).unwrap();
        writer.write_all(b"alpha").unwrap();
        writer.start_file("b.txt", options).unwrap();
        writer.write_all(b"beta").unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn visits_entries_in_order() {
        let mut source = ZipSource::new(Cursor::new(sample_zip()), "sample.zip").unwrap();
        assert_eq!(source.len(), 3);

        let mut seen = Vec::new();
        source
            .visit(|meta, reader| {
                let mut content = String::new();
                reader.read_to_string(&mut content).unwrap();
                seen.push((meta.name.clone(), meta.is_dir, content));
                Ok(Visit::Continue)
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                ("dir/".to_owned(), true, String::new()),
                ("dir/a.txt".to_owned(), false, "alpha".to_owned()),
                ("b.txt".to_owned(), false, "beta".to_owned()),
            ]
        );
    }

    #[test]
    fn stop_ends_the_walk() {
        let mut source = ZipSource::new(Cursor::new(sample_zip()), "sample.zip").unwrap();
        let mut visited = 0;
        source
            .visit(|_, _| {
                visited += 1;
                Ok(Visit::Stop)
            })
            .unwrap();
        assert_eq!(visited, 1);
    }

    #[test]
    fn garbage_is_corrupted() {
        let result = ZipSource::new(Cursor::new(vec![0xDE, 0xAD, 0xBE, 0xEF]), "bad.zip");
        assert!(matches!(result, Err(Error::Corrupted { .. })));
    }

    #[test]
    fn missing_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = ZipSource::open(&dir.path().join("missing.jar"));
        assert!(matches!(result, Err(Error::ArchiveNotFound(_))));
    }
}
