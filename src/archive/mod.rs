//! Comic archive access.
//!
//! The pipeline only talks to archives through [`ComicArchive`]: list and
//! read entries, stage writes, then commit them together. Staged writes
//! that are never committed are dropped with the handle, so an archive is
//! either fully updated or untouched.
//!
//! Container detection uses magic bytes, not the extension: a `.cbr` that
//! is really a zip file opens fine. Tar and 7z containers open read-only
//! and are repacked as CBZ before the first write. RAR is unsupported.

mod cbz;
mod repack;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub use cbz::CbzArchive;
pub use repack::{ensure_cbz, PackedArchive};

/// Archive extensions picked up when scanning
pub const COMIC_EXTENSIONS: &[&str] = &["cbz", "cbr", "cb7", "cbt"];

/// Archive handle with staged, all-or-nothing writes.
pub trait ComicArchive: Send {
    /// Location on disk
    fn path(&self) -> &Path;

    /// Entry names, including staged ones
    fn list_entries(&self) -> Result<Vec<String>, ArchiveError>;

    /// Read an entry; staged content wins over committed content
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError>;

    /// Stage an entry write (replaces an existing entry of the same name)
    fn write_entry(&mut self, name: &str, data: Vec<u8>) -> Result<(), ArchiveError>;

    /// Persist every staged write at once
    fn commit(&mut self) -> Result<(), ArchiveError>;

    fn contains(&self, name: &str) -> Result<bool, ArchiveError> {
        Ok(self.list_entries()?.iter().any(|entry| entry == name))
    }
}

/// Opens archives by path.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn ComicArchive>, ArchiveError>;

    /// Get the archive at `path` into a writable container, returning
    /// where it now lives.
    fn prepare_for_write(&self, path: &Path) -> Result<PathBuf, ArchiveError> {
        Ok(path.to_path_buf())
    }
}

/// Opens archives from the filesystem, choosing the container by content.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOpener;

impl ArchiveOpener for FsOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn ComicArchive>, ArchiveError> {
        match detect_format(path)? {
            ArchiveFormat::Zip => Ok(Box::new(CbzArchive::open(path)?)),
            format @ (ArchiveFormat::Tar | ArchiveFormat::SevenZip) => {
                Ok(Box::new(PackedArchive::open(path, format)?))
            }
            format => Err(ArchiveError::Unsupported {
                path: path.to_path_buf(),
                format,
            }),
        }
    }

    fn prepare_for_write(&self, path: &Path) -> Result<PathBuf, ArchiveError> {
        ensure_cbz(path)
    }
}

/// Container format detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Rar,
    SevenZip,
    Tar,
    Unknown,
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Zip => "zip",
            Self::Rar => "rar",
            Self::SevenZip => "7z",
            Self::Tar => "tar",
            Self::Unknown => "unknown",
        })
    }
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const RAR_MAGIC: &[u8] = b"Rar!\x1a\x07";
const SEVEN_ZIP_MAGIC: &[u8] = b"7z\xbc\xaf\x27\x1c";
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

/// Sniff the container format of a file.
pub fn detect_format(path: &Path) -> Result<ArchiveFormat, ArchiveError> {
    let mut header = Vec::with_capacity(TAR_MAGIC_OFFSET + TAR_MAGIC.len());
    File::open(path)
        .map_err(|e| ArchiveError::io(path, e))?
        .take((TAR_MAGIC_OFFSET + TAR_MAGIC.len()) as u64)
        .read_to_end(&mut header)
        .map_err(|e| ArchiveError::io(path, e))?;
    Ok(format_from_header(&header))
}

fn format_from_header(header: &[u8]) -> ArchiveFormat {
    if header.starts_with(ZIP_MAGIC) || header.starts_with(ZIP_EMPTY_MAGIC) {
        ArchiveFormat::Zip
    } else if header.starts_with(RAR_MAGIC) {
        ArchiveFormat::Rar
    } else if header.starts_with(SEVEN_ZIP_MAGIC) {
        ArchiveFormat::SevenZip
    } else if header
        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len())
        .is_some_and(|magic| magic == TAR_MAGIC)
    {
        ArchiveFormat::Tar
    } else {
        ArchiveFormat::Unknown
    }
}

/// Whether a path has a comic archive extension.
pub fn is_comic_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| COMIC_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Archive access errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt archive {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Unsupported {format} archive: {path}")]
    Unsupported { path: PathBuf, format: ArchiveFormat },

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Archive must be repacked as CBZ before writing: {0}")]
    ReadOnly(PathBuf),
}

impl ArchiveError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn corrupt(path: &Path, message: impl ToString) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_from_header() {
        assert_eq!(format_from_header(b"PK\x03\x04rest"), ArchiveFormat::Zip);
        assert_eq!(format_from_header(b"Rar!\x1a\x07\x01\x00"), ArchiveFormat::Rar);
        assert_eq!(
            format_from_header(b"7z\xbc\xaf\x27\x1c\x00\x04"),
            ArchiveFormat::SevenZip
        );
        assert_eq!(format_from_header(b"hello"), ArchiveFormat::Unknown);

        let mut tar = vec![0u8; 512];
        tar[257..262].copy_from_slice(b"ustar");
        assert_eq!(format_from_header(&tar), ArchiveFormat::Tar);
    }

    #[test]
    fn test_is_comic_archive() {
        assert!(is_comic_archive(Path::new("a/Example Comic 001.cbz")));
        assert!(is_comic_archive(Path::new("a/Example Comic 001.CBR")));
        assert!(!is_comic_archive(Path::new("a/cover.jpg")));
        assert!(!is_comic_archive(Path::new("a/noext")));
    }

    #[test]
    fn test_rar_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issue.cbr");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"Rar!\x1a\x07\x01\x00 rest of archive")
            .unwrap();

        let result = FsOpener.open(&path);
        assert!(matches!(
            result,
            Err(ArchiveError::Unsupported {
                format: ArchiveFormat::Rar,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_container_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issue.cbz");
        std::fs::write(&path, b"not an archive at all").unwrap();

        assert!(matches!(
            FsOpener.open(&path),
            Err(ArchiveError::Unsupported {
                format: ArchiveFormat::Unknown,
                ..
            })
        ));
        assert!(matches!(
            FsOpener.prepare_for_write(&path),
            Err(ArchiveError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_zip_with_cbr_extension_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("really_a_zip.cbr");
        crate::test_utils::write_cbz(&path, &[("page01.jpg", b"jpeg".as_slice())]);

        let archive = FsOpener.open(&path).unwrap();
        assert_eq!(archive.list_entries().unwrap(), vec!["page01.jpg".to_string()]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = detect_format(Path::new("/definitely/not/here.cbz"));
        assert!(matches!(result, Err(ArchiveError::Io { .. })));
    }
}
