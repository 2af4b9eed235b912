//! Show embedded metadata.

use std::path::Path;

use crate::archive::{ArchiveOpener, FsOpener};
use crate::metadata;

use super::print_issue;

/// Print the tags already embedded in an archive
pub fn cmd_show(path: &Path) -> anyhow::Result<()> {
    let mut archive = FsOpener.open(path)?;

    match metadata::read_existing(archive.as_mut())? {
        Some(tags) => {
            println!("{:?}", path);
            if let Some(merged_at) = tags.merged_at {
                println!("  Tagged:      {}", merged_at.format("%Y-%m-%d %H:%M UTC"));
            }
            println!();
            print_issue(&tags.issue, &tags.provenance);
        }
        None => println!("No embedded metadata in {:?}", path),
    }
    Ok(())
}
