//! Test utilities and fixtures for comic-minder tests.
//!
//! This module provides common test helpers, fixture records and an
//! in-memory archive to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{sample_issue, MemoryArchive};
//!
//! #[test]
//! fn test_something() {
//!     let mut archive = MemoryArchive::with_pages(3);
//!     let issue = sample_issue();
//!     // ... test logic
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use zip::write::SimpleFileOptions;

use crate::archive::{ArchiveError, ComicArchive};
use crate::model::{CanonicalIssue, Credit, IssueFormat, IssueNumber, ProviderCandidate};

/// A fully populated, valid issue record.
///
/// Customize using struct update syntax:
///
/// ```ignore
/// let issue = CanonicalIssue {
///     issue_title: None,
///     ..sample_issue()
/// };
/// ```
pub fn sample_issue() -> CanonicalIssue {
    CanonicalIssue {
        series_title: Some("Example Comic".to_string()),
        series_volume: Some(1),
        issue_number: IssueNumber::known("1"),
        issue_title: Some("Origins".to_string()),
        release_date: NaiveDate::from_ymd_opt(2020, 5, 6),
        summary: Some("The hero's first adventure & a new beginning.".to_string()),
        publisher: Some("Example Press".to_string()),
        format: Some(IssueFormat::Comic),
        rating: Some("Teen".to_string()),
        cover_url: Some("https://example.com/covers/1.jpg".to_string()),
        web_url: Some("https://example.com/issues/1".to_string()),
        credits: vec![
            Credit::new("Writer", "Jane Doe"),
            Credit::new("Penciller", "John Roe"),
        ],
        genres: vec!["Superhero".to_string()],
        characters: vec!["Example Hero".to_string()],
        teams: vec!["Example League".to_string()],
        locations: vec!["Example City".to_string()],
        story_arcs: vec!["First Light".to_string()],
        identifiers: BTreeMap::new(),
    }
}

/// A candidate from `provider` with the given confidence.
pub fn candidate(provider: &str, confidence: f32, issue: CanonicalIssue) -> ProviderCandidate {
    ProviderCandidate::new(provider, issue).with_confidence(confidence)
}

/// Write a zip-based comic archive with the given entries.
pub fn write_cbz(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).expect("Failed to create archive");
    let mut writer = zip::ZipWriter::new(file);
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start entry");
        writer.write_all(data).expect("Failed to write entry");
    }
    writer.finish().expect("Failed to finish archive");
}

/// In-memory [`ComicArchive`] that records commits.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    path: PathBuf,
    committed: BTreeMap<String, Vec<u8>>,
    staged: BTreeMap<String, Vec<u8>>,
    commits: usize,
    fail_commit: bool,
}

impl MemoryArchive {
    /// An archive holding `count` fake page images.
    pub fn with_pages(count: usize) -> Self {
        let committed = (1..=count)
            .map(|i| (format!("page{i:02}.jpg"), vec![0xFF, 0xD8, i as u8]))
            .collect();
        Self {
            path: PathBuf::from("/memory/Example Comic 001.cbz"),
            committed,
            ..Default::default()
        }
    }

    /// Every commit fails with an IO error.
    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Put an entry straight into the committed content.
    pub fn insert_committed(&mut self, name: &str, data: Vec<u8>) {
        self.committed.insert(name.to_string(), data);
    }

    pub fn committed_entry(&self, name: &str) -> Option<&[u8]> {
        self.committed.get(name).map(Vec::as_slice)
    }

    pub fn staged_names(&self) -> Vec<String> {
        self.staged.keys().cloned().collect()
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl ComicArchive for MemoryArchive {
    fn path(&self) -> &Path {
        &self.path
    }

    fn list_entries(&self) -> Result<Vec<String>, ArchiveError> {
        let mut names: Vec<String> = self.committed.keys().cloned().collect();
        for name in self.staged.keys() {
            if !self.committed.contains_key(name) {
                names.push(name.clone());
            }
        }
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        self.staged
            .get(name)
            .or_else(|| self.committed.get(name))
            .cloned()
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))
    }

    fn write_entry(&mut self, name: &str, data: Vec<u8>) -> Result<(), ArchiveError> {
        self.staged.insert(name.to_string(), data);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ArchiveError> {
        if self.fail_commit {
            self.staged.clear();
            return Err(ArchiveError::io(
                &self.path,
                std::io::Error::other("simulated commit failure"),
            ));
        }
        self.committed.append(&mut self.staged);
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_issue_is_valid() {
        assert!(sample_issue().validate().is_ok());
        assert!(sample_issue().identifiers.is_empty());
    }

    #[test]
    fn test_memory_archive_stages_until_commit() {
        let mut archive = MemoryArchive::with_pages(2);
        archive.write_entry("ComicInfo.xml", b"<ComicInfo/>".to_vec()).unwrap();

        assert_eq!(archive.read_entry("ComicInfo.xml").unwrap(), b"<ComicInfo/>");
        assert!(archive.committed_entry("ComicInfo.xml").is_none());
        assert_eq!(archive.list_entries().unwrap().len(), 3);

        archive.commit().unwrap();
        assert_eq!(archive.commits(), 1);
        assert!(archive.staged_names().is_empty());
        assert!(archive.committed_entry("ComicInfo.xml").is_some());
    }

    #[test]
    fn test_write_cbz_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.cbz");
        write_cbz(&path, &[("page01.jpg", b"image")]);

        let mut zip = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
        assert_eq!(zip.by_index(0).unwrap().name(), "page01.jpg");
    }
}
