//! Batch tagging command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::archive::FsOpener;
use crate::config::Config;
use crate::pipeline::{self, Outcome, Pipeline, PipelineOptions};
use crate::{providers, scanner};

/// Switches for one `tag` run
pub struct TagFlags {
    pub recursive: bool,
    pub dry_run: bool,
    pub force: bool,
    pub organize: bool,
    pub destination: Option<PathBuf>,
    pub explicit_ids: BTreeMap<String, String>,
}

/// Match, merge and embed metadata for every archive under `path`
pub fn cmd_tag(rt: &Runtime, config: Config, path: &Path, flags: TagFlags) -> anyhow::Result<()> {
    if !path.exists() {
        eprintln!("Error: {:?} does not exist", path);
        std::process::exit(1);
    }
    check_explicit_ids(path, &flags.explicit_ids)?;

    let organize = flags.organize || config.output.organize;
    let root = collection_root(path, flags.destination, &config);
    if organize && root.is_none() {
        eprintln!("Error: --organize needs a collection root.");
        eprintln!("Pass --destination or set output.collection_root in the config file.");
        std::process::exit(1);
    }

    let providers = providers::build_providers(&config.credentials)?;
    if providers.is_empty() {
        eprintln!("Error: no metadata provider configured.");
        eprintln!("Set COMICVINE_API_KEY and/or METRON_USERNAME + METRON_PASSWORD,");
        eprintln!("or add them to the [credentials] section of the config file.");
        std::process::exit(1);
    }

    let options = PipelineOptions {
        dry_run: flags.dry_run,
        force: flags.force,
        organize,
        collection_root: root,
        explicit_ids: flags.explicit_ids,
    };
    let config = Arc::new(config);

    let report = rt.block_on(async {
        let pipeline = Pipeline::new(config, providers, Arc::new(FsOpener), options);
        if pipeline.options().dry_run {
            println!("DRY RUN - no changes will be made\n");
        }
        let cancel = pipeline::cancel_on_ctrl_c();
        let paths = scanner::scan(path.to_path_buf(), flags.recursive);
        pipeline.run_batch(paths, &cancel).await
    });

    if report.archives.is_empty() {
        println!("No comic archives found.");
        return Ok(());
    }

    for archive in &report.archives {
        let name = archive
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("?");
        let mark = match archive.outcome {
            Outcome::Tagged { .. } => "✓",
            Outcome::Skipped(_) | Outcome::Cancelled => "-",
            _ => "✗",
        };
        print!("{} {}: {}", mark, name, archive.outcome);
        if let Some(merged) = &archive.merged {
            let issue = &merged.issue;
            print!(
                " ({} #{})",
                issue.series_title.as_deref().unwrap_or("?"),
                issue.issue_number
            );
        }
        println!();
        if let Some(destination) = &archive.destination {
            println!("    → {:?}", destination);
        }
    }

    println!();
    println!("Done! {}", report);

    if flags.dry_run {
        println!("\nRun without --dry-run to write tags.");
    }
    if report.has_failures() {
        std::process::exit(2);
    }
    Ok(())
}

/// Provider ids name one issue, so they only make sense for one archive.
fn check_explicit_ids(path: &Path, ids: &BTreeMap<String, String>) -> anyhow::Result<()> {
    if !ids.is_empty() && !path.is_file() {
        anyhow::bail!(
            "provider ids (--comicvine-id, --metron-id) need a single archive, not the directory {:?}",
            path
        );
    }
    Ok(())
}

/// Where `--organize` files archives: the flag, then the config, then the scanned directory.
fn collection_root(path: &Path, destination: Option<PathBuf>, config: &Config) -> Option<PathBuf> {
    destination
        .or_else(|| config.output.collection_root.clone())
        .or_else(|| path.is_dir().then(|| path.to_path_buf()))
}
