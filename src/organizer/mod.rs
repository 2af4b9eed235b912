//! File organization and movement utilities.
//!
//! Moves tagged archives into a structured collection layout based on a
//! naming pattern like `{Publisher}/{Series}/{Issue}.{ext}`.
//!
//! # Pattern variables
//! - `{Publisher}`: publisher name (`Unknown Publisher` when absent)
//! - `{Series}`: series title, with ` vN` appended for volumes after the first
//! - `{Volume}`: bare volume number
//! - `{Number}`: issue number, zero-padded (3 digits for comics, 2 otherwise)
//! - `{Issue}`: series, format marker and number, e.g. `Example Comic_#001`,
//!   `Example Comic_Annual_#01`, `Example Comic_#01_TP`
//! - `{Year}`, `{Title}`, `{Format}`, `{ext}`
//!
//! # Features
//! - Preview mode to see changes before applying
//! - Cross-device moves fall back to copy + delete
//! - Automatic cleanup of emptied directories

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::model::{CanonicalIssue, IssueFormat};

/// Layout used when the configuration does not name one
pub const DEFAULT_PATTERN: &str = "{Publisher}/{Series}/{Issue}.{ext}";

/// Organization errors
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    #[error("Failed to create directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to move {0} to {1}: {2}")]
    Move(PathBuf, PathBuf, std::io::Error),

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("No collection root to organize into")]
    NoCollectionRoot,
}

/// Preview result for dry-run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizePreview {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl OrganizePreview {
    /// The archive is already where the pattern puts it
    pub fn is_noop(&self) -> bool {
        self.source == self.destination
    }
}

/// Generates a preview of what organize would do (dry-run)
pub fn preview_organize(
    source_path: &Path,
    issue: &CanonicalIssue,
    pattern: &str,
    destination_root: &Path,
) -> OrganizePreview {
    let ext = source_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("cbz");

    OrganizePreview {
        source: source_path.to_path_buf(),
        destination: destination_root.join(render_pattern(issue, pattern, ext)),
    }
}

/// Substitute the pattern variables for one issue.
pub fn render_pattern(issue: &CanonicalIssue, pattern: &str, ext: &str) -> String {
    let series = series_name(issue);
    let year = issue.year().map(|y| y.to_string()).unwrap_or_default();
    let volume = issue
        .series_volume
        .map(|v| v.to_string())
        .unwrap_or_default();

    pattern
        .replace(
            "{Publisher}",
            &sanitize_filename(issue.publisher.as_deref().unwrap_or("Unknown Publisher")),
        )
        .replace("{Series}", &sanitize_filename(&series))
        .replace("{Volume}", &volume)
        .replace("{Number}", &sanitize_filename(&padded_number(issue)))
        .replace("{Issue}", &sanitize_filename(&issue_stem(issue)))
        .replace("{Year}", &year)
        .replace(
            "{Title}",
            &sanitize_filename(issue.issue_title.as_deref().unwrap_or_default()),
        )
        .replace(
            "{Format}",
            issue.format.map(IssueFormat::as_str).unwrap_or_default(),
        )
        .replace("{ext}", ext)
}

fn series_name(issue: &CanonicalIssue) -> String {
    let title = issue.series_title.as_deref().unwrap_or("Unknown Series");
    match issue.series_volume {
        Some(volume) if volume > 1 => format!("{title} v{volume}"),
        _ => title.to_string(),
    }
}

/// Zero-pad the leading digits of the issue number.
fn padded_number(issue: &CanonicalIssue) -> String {
    let width = match issue.format {
        None | Some(IssueFormat::Comic) => 3,
        Some(_) => 2,
    };
    let Some(number) = issue.issue_number.as_str() else {
        return String::new();
    };
    let digits = number
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(number.len());
    if digits == 0 {
        return number.to_string();
    }
    let (int_part, rest) = number.split_at(digits);
    format!("{int_part:0>width$}{rest}")
}

fn issue_stem(issue: &CanonicalIssue) -> String {
    let series = series_name(issue);
    let number = match padded_number(issue) {
        n if n.is_empty() => String::new(),
        n => format!("_#{n}"),
    };
    match issue.format {
        Some(IssueFormat::Annual) => format!("{series}_Annual{number}"),
        Some(IssueFormat::DigitalChapter) => format!("{series}_Chapter{number}"),
        Some(IssueFormat::GraphicNovel) => format!("{series}{number}_GN"),
        Some(IssueFormat::Hardcover) => format!("{series}{number}_HC"),
        Some(IssueFormat::TradePaperback) => format!("{series}{number}_TP"),
        None | Some(IssueFormat::Comic) => format!("{series}{number}"),
    }
}

/// Moves an archive to the location the pattern describes.
///
/// Refuses to overwrite a different existing file. Directories left empty by
/// the move are removed, up to (never including) `destination_root`; for a
/// source outside the root only its own directory is.
pub fn organize_archive(
    source_path: &Path,
    issue: &CanonicalIssue,
    pattern: &str,
    destination_root: &Path,
) -> Result<PathBuf, OrganizeError> {
    let preview = preview_organize(source_path, issue, pattern, destination_root);
    if preview.is_noop() {
        return Ok(preview.destination);
    }
    let dest_path = preview.destination;
    if dest_path.exists() {
        return Err(OrganizeError::DestinationExists(dest_path));
    }

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent).map_err(|e| OrganizeError::CreateDir(parent.to_path_buf(), e))?;
    }

    if let Err(e) = fs::rename(source_path, &dest_path) {
        // Cross-device: copy + delete
        debug!(error = %e, "Rename failed, copying instead");
        fs::copy(source_path, &dest_path)
            .map_err(|e| OrganizeError::Move(source_path.to_path_buf(), dest_path.clone(), e))?;
        fs::remove_file(source_path)
            .map_err(|e| OrganizeError::Move(source_path.to_path_buf(), dest_path.clone(), e))?;
    }

    if let Some(parent) = source_path.parent() {
        remove_empty_dirs(parent, destination_root);
    }

    Ok(dest_path)
}

/// Sanitizes a filename by removing/replacing invalid characters.
///
/// `.` and `..` (or any dot-only name) become `_` so a value can never
/// name the current or parent directory.
pub fn sanitize_filename(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

fn is_empty_dir(path: &Path) -> bool {
    path.is_dir()
        && fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
}

/// Removes empty directories from `path` upwards, stopping at `root`
fn remove_empty_dirs(path: &Path, root: &Path) {
    let mut current = Some(path);
    while let Some(dir) = current {
        if dir == root || !is_empty_dir(dir) {
            break;
        }
        if let Err(e) = fs::remove_dir(dir) {
            debug!(dir = ?dir, error = %e, "Could not remove emptied directory");
            break;
        }
        current = dir.parent().filter(|parent| parent.starts_with(root));
    }
}
