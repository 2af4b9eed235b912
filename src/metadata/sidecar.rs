//! `ComicMinder.json` sidecar: the full merged record with provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TagError;
use crate::model::{CanonicalIssue, FieldProvenance, MergedMetadata};

/// Archive entry name
pub const ENTRY_NAME: &str = "ComicMinder.json";

/// Bumped whenever the layout changes incompatibly
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    schema_version: u32,
    #[serde(default)]
    generator: String,
    issue: CanonicalIssue,
    #[serde(default)]
    provenance: FieldProvenance,
    merged_at: DateTime<Utc>,
}

pub fn render(merged: &MergedMetadata) -> Result<Vec<u8>, TagError> {
    let document = Document {
        schema_version: SCHEMA_VERSION,
        generator: concat!("comic-minder ", env!("CARGO_PKG_VERSION")).to_string(),
        issue: merged.issue.clone(),
        provenance: merged.provenance.clone(),
        merged_at: merged.merged_at,
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

pub fn parse(json: &[u8]) -> Result<MergedMetadata, TagError> {
    let document: Document = serde_json::from_slice(json)?;
    if document.schema_version > SCHEMA_VERSION {
        return Err(TagError::UnsupportedSchema(document.schema_version));
    }
    Ok(MergedMetadata {
        issue: document.issue,
        provenance: document.provenance,
        merged_at: document.merged_at,
    })
}
