//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `tag`: Batch match, merge and write tags
//! - `identify`: Match and merge one archive without writing
//! - `show`: Print tags already embedded in an archive
//! - `init_config`: Write the default configuration file

mod identify;
mod init_config;
mod show;
mod tag;

use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::{self, Config, Credentials};
use crate::model::{CanonicalIssue, Field, FieldProvenance, Provenance};
use crate::providers::{comicvine, metron};

pub use identify::cmd_identify;
pub use init_config::cmd_init_config;
pub use show::cmd_show;
pub use tag::cmd_tag;

/// Comic Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Provider credentials; override the config file when given
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Comic Vine API key (or set COMICVINE_API_KEY env var)
    #[arg(long, env = "COMICVINE_API_KEY", hide_env_values = true)]
    pub comicvine_api_key: Option<String>,

    /// Metron username (or set METRON_USERNAME env var)
    #[arg(long, env = "METRON_USERNAME")]
    pub metron_username: Option<String>,

    /// Metron password (or set METRON_PASSWORD env var)
    #[arg(long, env = "METRON_PASSWORD", hide_env_values = true)]
    pub metron_password: Option<String>,
}

impl From<CredentialArgs> for Credentials {
    fn from(args: CredentialArgs) -> Self {
        Self {
            comicvine_api_key: args.comicvine_api_key,
            metron_username: args.metron_username,
            metron_password: args.metron_password,
        }
    }
}

/// Explicit provider identifiers; `tag` accepts them only for a single archive
#[derive(Args, Debug, Clone, Default)]
pub struct IdArgs {
    /// Comic Vine issue id (e.g. 4000-12345 or 12345)
    #[arg(long)]
    pub comicvine_id: Option<String>,

    /// Metron issue id
    #[arg(long)]
    pub metron_id: Option<String>,
}

impl IdArgs {
    fn to_map(&self) -> BTreeMap<String, String> {
        [
            (comicvine::PROVIDER_NAME, &self.comicvine_id),
            (metron::PROVIDER_NAME, &self.metron_id),
        ]
        .into_iter()
        .filter_map(|(name, id)| id.clone().map(|id| (name.to_string(), id)))
        .collect()
    }
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Match, merge and embed metadata for comic archives
    Tag {
        /// Archive or directory to tag
        path: PathBuf,
        /// Recursive directory scan
        #[arg(short, long)]
        recursive: bool,
        /// Show what would be done without changing any file
        #[arg(long)]
        dry_run: bool,
        /// Re-tag archives inside the recheck window and rewrite unchanged tags
        #[arg(long)]
        force: bool,
        /// Move tagged archives into the collection layout
        #[arg(long)]
        organize: bool,
        /// Collection root for --organize (default: output.collection_root, then the scanned directory)
        #[arg(long)]
        destination: Option<PathBuf>,
        #[command(flatten)]
        ids: IdArgs,
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Match and merge one archive, print the result without writing
    Identify {
        /// Path to the archive
        path: PathBuf,
        #[command(flatten)]
        ids: IdArgs,
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Print metadata already embedded in an archive
    Show {
        /// Path to the archive
        path: PathBuf,
    },
    /// Write the default configuration file
    InitConfig {
        /// Where to write (default: the standard config location)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Tag {
            path,
            recursive,
            dry_run,
            force,
            organize,
            destination,
            ids,
            credentials,
        } => {
            let rt = Runtime::new()?;
            let config = load_config(cli.config.as_deref(), credentials)?;
            cmd_tag(
                &rt,
                config,
                path,
                tag::TagFlags {
                    recursive: *recursive,
                    dry_run: *dry_run,
                    force: *force,
                    organize: *organize,
                    destination: destination.clone(),
                    explicit_ids: ids.to_map(),
                },
            )
        }
        Commands::Identify {
            path,
            ids,
            credentials,
        } => {
            let rt = Runtime::new()?;
            let config = load_config(cli.config.as_deref(), credentials)?;
            cmd_identify(&rt, config, path, ids.to_map())
        }
        Commands::Show { path } => cmd_show(path),
        Commands::InitConfig { path, force } => {
            cmd_init_config(path.as_deref().or(cli.config.as_deref()), *force)
        }
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Load the config file (strictly when a path was given) and apply
/// credential overrides.
fn load_config(path: Option<&Path>, credentials: &CredentialArgs) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => config::load_from(path)?,
        None => config::load(),
    };
    config.credentials = config
        .credentials
        .with_overrides(credentials.clone().into());
    Ok(config)
}

/// Print an issue record, with the provider of each field when known
pub(crate) fn print_issue(issue: &CanonicalIssue, provenance: &FieldProvenance) {
    let source = |field: Field| match provenance.get(&field) {
        Some(Provenance::Single(provider)) => format!("  [{provider}]"),
        Some(Provenance::Union(providers)) => format!("  [{}]", providers.join(", ")),
        None => String::new(),
    };
    let line = |label: &str, field: Field, value: Option<String>| {
        if let Some(value) = value {
            println!("  {:<12} {}{}", label, value, source(field));
        }
    };

    line("Series:", Field::SeriesTitle, issue.series_title.clone());
    line("Volume:", Field::SeriesVolume, issue.series_volume.map(|v| v.to_string()));
    line("Number:", Field::IssueNumber, issue.issue_number.as_str().map(String::from));
    line("Title:", Field::IssueTitle, issue.issue_title.clone());
    line("Released:", Field::ReleaseDate, issue.release_date.map(|d| d.to_string()));
    line("Publisher:", Field::Publisher, issue.publisher.clone());
    line("Format:", Field::Format, issue.format.map(|f| f.to_string()));
    line("Rating:", Field::Rating, issue.rating.clone());
    line("Web:", Field::WebUrl, issue.web_url.clone());

    if !issue.credits.is_empty() {
        println!("  Credits:{}", source(Field::Credits));
        for credit in &issue.credits {
            println!("    {:<16} {}", credit.role, credit.name);
        }
    }

    let lists = [
        ("Genres:", Field::Genres, &issue.genres),
        ("Characters:", Field::Characters, &issue.characters),
        ("Teams:", Field::Teams, &issue.teams),
        ("Locations:", Field::Locations, &issue.locations),
        ("Story arcs:", Field::StoryArcs, &issue.story_arcs),
    ];
    for (label, field, values) in lists {
        if !values.is_empty() {
            line(label, field, Some(values.join(", ")));
        }
    }

    for (provider, id) in &issue.identifiers {
        println!("  {:<12} {}", format!("{provider} id:"), id);
    }

    if let Some(summary) = &issue.summary {
        println!();
        println!("  {}{}", summary, source(Field::Summary));
    }
}
