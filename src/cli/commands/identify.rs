//! Identify a single archive without writing to it.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::archive::FsOpener;
use crate::config::Config;
use crate::pipeline::{Outcome, Pipeline, PipelineOptions};
use crate::providers;

use super::print_issue;

/// Match and merge one archive, then print the merged record
pub fn cmd_identify(
    rt: &Runtime,
    config: Config,
    path: &Path,
    explicit_ids: BTreeMap<String, String>,
) -> anyhow::Result<()> {
    let providers = providers::build_providers(&config.credentials)?;
    if providers.is_empty() {
        eprintln!("Error: no metadata provider configured.");
        std::process::exit(1);
    }

    println!("Identifying: {:?}", path);
    println!();

    let options = PipelineOptions {
        dry_run: true,
        force: true,
        explicit_ids,
        ..Default::default()
    };
    let report = rt.block_on(async {
        Pipeline::new(Arc::new(config), providers, Arc::new(FsOpener), options)
            .process_archive(path)
            .await
    });

    match (&report.outcome, &report.merged) {
        (Outcome::Tagged { .. }, Some(merged)) => {
            println!("✓ Match found!");
            println!();
            print_issue(&merged.issue, &merged.provenance);
        }
        (Outcome::NoMatch, _) => {
            println!("✗ No provider returned a match for this archive.");
            println!("  Try --comicvine-id or --metron-id to pin the issue.");
        }
        (outcome, _) => {
            eprintln!("Error: {}", outcome);
            std::process::exit(1);
        }
    }
    Ok(())
}
