//! Default configuration file.

use std::path::Path;

use crate::config::{self, Config};

/// Write the default configuration to `path` (or the standard location)
pub fn cmd_init_config(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => config::config_path().ok_or(config::ConfigError::NoConfigDir)?,
    };

    if target.exists() && !force {
        eprintln!("Config already exists at {:?}", target);
        eprintln!("Use --force to overwrite it with the defaults.");
        std::process::exit(1);
    }

    config::save_to(&Config::default(), &target)?;
    println!("✓ Wrote default config to {:?}", target);
    println!("  Add provider credentials under [credentials] before running `tag`.");
    Ok(())
}
