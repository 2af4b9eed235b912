//! CBT (tar) and CB7 (7z) archives.
//!
//! Both are read fully into memory and served read-only. Writing tags
//! needs a zip container, so [`ensure_cbz`] repacks them as a CBZ next to
//! the original before the first commit.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{detect_format, ArchiveError, ArchiveFormat, ComicArchive};

/// A tar or 7z archive unpacked into memory.
pub struct PackedArchive {
    path: PathBuf,
    entries: Vec<(String, Vec<u8>)>,
    staged: Vec<(String, Vec<u8>)>,
}

impl PackedArchive {
    pub fn open(path: &Path, format: ArchiveFormat) -> Result<Self, ArchiveError> {
        Ok(Self {
            path: path.to_path_buf(),
            entries: unpack(path, format)?,
            staged: Vec::new(),
        })
    }
}

impl ComicArchive for PackedArchive {
    fn path(&self) -> &Path {
        &self.path
    }

    fn list_entries(&self) -> Result<Vec<String>, ArchiveError> {
        let mut names: Vec<String> = self.entries.iter().map(|(name, _)| name.clone()).collect();
        for (name, _) in &self.staged {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        self.staged
            .iter()
            .chain(&self.entries)
            .find(|(entry, _)| entry == name)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))
    }

    fn write_entry(&mut self, name: &str, data: Vec<u8>) -> Result<(), ArchiveError> {
        self.staged.retain(|(entry, _)| entry != name);
        self.staged.push((name.to_string(), data));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ArchiveError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        Err(ArchiveError::ReadOnly(self.path.clone()))
    }
}

/// Make sure the archive at `path` is a zip container, repacking CBT and
/// CB7 archives as CBZ. Returns the path that now holds the archive.
///
/// The CBZ takes the original's stem; the original is removed only after
/// the new file is in place. An existing file at the target is an error.
pub fn ensure_cbz(path: &Path) -> Result<PathBuf, ArchiveError> {
    let format = detect_format(path)?;
    match format {
        ArchiveFormat::Zip => Ok(path.to_path_buf()),
        ArchiveFormat::Tar | ArchiveFormat::SevenZip => {
            let entries = unpack(path, format)?;
            let target = path.with_extension("cbz");
            write_zip(&target, &entries, target != path)?;
            if target != path {
                std::fs::remove_file(path).map_err(|e| ArchiveError::io(path, e))?;
            }
            info!(from = ?path, to = ?target, format = %format, "Repacked archive as CBZ");
            Ok(target)
        }
        format => Err(ArchiveError::Unsupported {
            path: path.to_path_buf(),
            format,
        }),
    }
}

fn unpack(path: &Path, format: ArchiveFormat) -> Result<Vec<(String, Vec<u8>)>, ArchiveError> {
    match format {
        ArchiveFormat::Tar => unpack_tar(path),
        ArchiveFormat::SevenZip => unpack_7z(path),
        format => Err(ArchiveError::Unsupported {
            path: path.to_path_buf(),
            format,
        }),
    }
}

fn unpack_tar(path: &Path) -> Result<Vec<(String, Vec<u8>)>, ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    let mut archive = tar::Archive::new(file);
    let mut entries = Vec::new();
    for entry in archive.entries().map_err(|e| ArchiveError::corrupt(path, e))? {
        let mut entry = entry.map_err(|e| ArchiveError::corrupt(path, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| ArchiveError::corrupt(path, e))?
            .to_string_lossy()
            .replace('\\', "/");
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::corrupt(path, e))?;
        entries.push((name, data));
    }
    Ok(entries)
}

fn unpack_7z(path: &Path) -> Result<Vec<(String, Vec<u8>)>, ArchiveError> {
    let mut reader = sevenz_rust::SevenZReader::open(path, sevenz_rust::Password::empty())
        .map_err(|e| ArchiveError::corrupt(path, e))?;
    let mut entries = Vec::new();
    let mut read_error = None;
    reader
        .for_each_entries(|entry, data| {
            if entry.is_directory() {
                return Ok(true);
            }
            let mut content = Vec::new();
            if let Err(e) = data.read_to_end(&mut content) {
                read_error = Some(e);
                return Ok(false);
            }
            entries.push((entry.name().replace('\\', "/"), content));
            Ok(true)
        })
        .map_err(|e| ArchiveError::corrupt(path, e))?;
    if let Some(e) = read_error {
        return Err(ArchiveError::corrupt(path, e));
    }
    Ok(entries)
}

fn write_zip(target: &Path, entries: &[(String, Vec<u8>)], new_file: bool) -> Result<(), ArchiveError> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ArchiveError::io(target, e))?;

    {
        let mut writer = ZipWriter::new(temp.as_file_mut());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in entries {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| ArchiveError::corrupt(target, e))?;
            writer.write_all(data).map_err(|e| ArchiveError::io(target, e))?;
        }
        writer.finish().map_err(|e| ArchiveError::corrupt(target, e))?;
    }

    temp.as_file().sync_all().map_err(|e| ArchiveError::io(target, e))?;
    if new_file {
        temp.persist_noclobber(target)
            .map_err(|e| ArchiveError::io(target, e.error))?;
    } else {
        temp.persist(target).map_err(|e| ArchiveError::io(target, e.error))?;
    }
    Ok(())
}
