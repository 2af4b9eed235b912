//! Embedded comic metadata reading and writing.
//!
//! Two documents are derived from the same [`MergedMetadata`]:
//! - `ComicInfo.xml` - the standard schema other comic readers/taggers use
//! - `ComicMinder.json` - the full, lossless record plus provenance and
//!   merge time
//!
//! # Features
//! - Validate before anything is rendered or staged
//! - Render both documents in parallel
//! - Stage both entries and commit them together (all-or-nothing)
//! - Read tags back from previously tagged archives

pub mod comic_info;
pub mod sidecar;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::archive::{ArchiveError, ComicArchive};
use crate::model::{CanonicalIssue, FieldProvenance, MergedMetadata, ValidationError};

/// Tag reading/writing errors.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Unsupported sidecar schema version {0}")]
    UnsupportedSchema(u32),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Which documents to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagOptions {
    pub comic_info: bool,
    pub sidecar: bool,
}

impl Default for TagOptions {
    fn default() -> Self {
        Self {
            comic_info: true,
            sidecar: true,
        }
    }
}

/// Rendered documents, ready to be staged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedTags {
    pub comic_info: Option<Vec<u8>>,
    pub sidecar: Option<Vec<u8>>,
}

impl RenderedTags {
    /// (entry name, bytes) pairs in write order
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &[u8])> {
        [
            (comic_info::ENTRY_NAME, self.comic_info.as_deref()),
            (sidecar::ENTRY_NAME, self.sidecar.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, data)| data.map(|d| (name, d)))
    }
}

/// Serializes merged metadata and hands it to an archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagWriter {
    options: TagOptions,
}

impl TagWriter {
    pub fn new(options: TagOptions) -> Self {
        Self { options }
    }

    /// Validate, then render the enabled documents.
    pub fn render(&self, merged: &MergedMetadata) -> Result<RenderedTags, TagError> {
        merged.issue.validate()?;

        let (xml, json) = rayon::join(
            || {
                self.options
                    .comic_info
                    .then(|| comic_info::render(&merged.issue))
                    .transpose()
            },
            || {
                self.options
                    .sidecar
                    .then(|| sidecar::render(merged))
                    .transpose()
            },
        );

        Ok(RenderedTags {
            comic_info: xml?,
            sidecar: json?,
        })
    }

    /// Render, stage and commit. Nothing reaches the archive unless every
    /// document rendered.
    pub fn write(
        &self,
        archive: &mut dyn ComicArchive,
        merged: &MergedMetadata,
    ) -> Result<RenderedTags, TagError> {
        let rendered = self.render(merged)?;
        stage(archive, &rendered)?;
        archive.commit()?;
        debug!(path = ?archive.path(), "Tags committed");
        Ok(rendered)
    }
}

/// Stage rendered documents without committing.
pub fn stage(archive: &mut dyn ComicArchive, rendered: &RenderedTags) -> Result<(), TagError> {
    for (name, data) in rendered.entries() {
        archive.write_entry(name, data.to_vec())?;
    }
    Ok(())
}

/// Metadata found in an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingTags {
    pub issue: CanonicalIssue,
    pub provenance: FieldProvenance,
    /// Set when the sidecar was found
    pub merged_at: Option<DateTime<Utc>>,
}

/// Read previously written tags, preferring the sidecar.
///
/// Returns `None` when the archive carries neither document. A sidecar that
/// fails to parse falls back to `ComicInfo.xml`.
pub fn read_existing(archive: &mut dyn ComicArchive) -> Result<Option<ExistingTags>, TagError> {
    let entries = archive.list_entries()?;
    let has = |name: &str| entries.iter().any(|e| e == name);

    if has(sidecar::ENTRY_NAME) {
        let data = archive.read_entry(sidecar::ENTRY_NAME)?;
        match sidecar::parse(&data) {
            Ok(merged) => {
                return Ok(Some(ExistingTags {
                    issue: merged.issue,
                    provenance: merged.provenance,
                    merged_at: Some(merged.merged_at),
                }));
            }
            Err(e) => warn!(path = ?archive.path(), error = %e, "Ignoring unreadable sidecar"),
        }
    }

    if has(comic_info::ENTRY_NAME) {
        let data = archive.read_entry(comic_info::ENTRY_NAME)?;
        return Ok(Some(ExistingTags {
            issue: comic_info::parse(&data)?,
            provenance: FieldProvenance::new(),
            merged_at: None,
        }));
    }

    Ok(None)
}
