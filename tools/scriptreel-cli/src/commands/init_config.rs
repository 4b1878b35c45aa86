//! Write the default configuration file.

use std::path::PathBuf;

use scriptreel_common::config::{config_file_path, AppConfig};

pub fn run(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let target = path.unwrap_or_else(config_file_path);
    if target.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            target.display()
        );
    }

    AppConfig::default()
        .save_to(&target)
        .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;
    println!("Wrote default config: {}", target.display());
    Ok(())
}
