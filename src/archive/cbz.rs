//! CBZ (zip) archives.
//!
//! Commits rebuild the archive into a temp file in the same directory,
//! copying untouched entries raw (no recompression), then atomically
//! replace the original.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{ArchiveError, ComicArchive};

/// A zip-based comic archive.
pub struct CbzArchive {
    path: PathBuf,
    archive: ZipArchive<File>,
    staged: BTreeMap<String, Vec<u8>>,
}

impl CbzArchive {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        Ok(Self {
            path: path.to_path_buf(),
            archive: open_zip(path)?,
            staged: BTreeMap::new(),
        })
    }

    fn rebuild(&mut self) -> Result<(), ArchiveError> {
        let path = self.path.clone();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ArchiveError::io(&path, e))?;

        {
            let mut writer = ZipWriter::new(temp.as_file_mut());
            for index in 0..self.archive.len() {
                let entry = self
                    .archive
                    .by_index_raw(index)
                    .map_err(|e| ArchiveError::corrupt(&path, e))?;
                if self.staged.contains_key(entry.name()) {
                    continue;
                }
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| ArchiveError::corrupt(&path, e))?;
            }

            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            for (name, data) in &self.staged {
                writer
                    .start_file(name.as_str(), options)
                    .map_err(|e| ArchiveError::corrupt(&path, e))?;
                writer.write_all(data).map_err(|e| ArchiveError::io(&path, e))?;
            }
            writer
                .finish()
                .map_err(|e| ArchiveError::corrupt(&path, e))?;
        }

        temp.as_file()
            .sync_all()
            .map_err(|e| ArchiveError::io(&path, e))?;
        temp.persist(&path)
            .map_err(|e| ArchiveError::io(&path, e.error))?;
        Ok(())
    }
}

fn open_zip(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    ZipArchive::new(file).map_err(|e| ArchiveError::corrupt(path, e))
}

impl ComicArchive for CbzArchive {
    fn path(&self) -> &Path {
        &self.path
    }

    fn list_entries(&self) -> Result<Vec<String>, ArchiveError> {
        let mut entries: Vec<String> = self.archive.file_names().map(String::from).collect();
        for name in self.staged.keys() {
            if !entries.contains(name) {
                entries.push(name.clone());
            }
        }
        Ok(entries)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        if let Some(data) = self.staged.get(name) {
            return Ok(data.clone());
        }
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(ArchiveError::EntryNotFound(name.to_string()));
            }
            Err(e) => return Err(ArchiveError::corrupt(&self.path, e)),
        };
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::io(&self.path, e))?;
        Ok(data)
    }

    fn write_entry(&mut self, name: &str, data: Vec<u8>) -> Result<(), ArchiveError> {
        self.staged.insert(name.to_string(), data);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ArchiveError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        debug!(path = ?self.path, entries = self.staged.len(), "Committing archive");
        self.rebuild()?;
        self.archive = open_zip(&self.path)?;
        self.staged.clear();
        Ok(())
    }
}
