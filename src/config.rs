//! `mdtool.toml` loading and generation.
//!
//! Every setting has a default, so the file is optional and may list only the
//! values that differ from the defaults.

use crate::sinks::pdf::PDF;
use crate::sources::web::Web;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "mdtool.toml";

/// Complete configuration for mdtool.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Configuration {
    #[serde(default)]
    pub pdf: PDF,
    #[serde(default)]
    pub web: Web,
}

impl Configuration {
    /// Load configuration from an explicit path, or from `mdtool.toml` in the
    /// current directory when present. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Configuration> {
        let path = match path {
            Some(path) if !path.exists() => {
                return Err(anyhow!("Config file '{}' doesn't exist", path.display()))
            }
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(CONFIG_FILE);
                if !path.exists() {
                    debug!("no {CONFIG_FILE} found, using defaults");
                    return Ok(Configuration::default());
                }
                path
            }
        };

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to load {} contents", path.display()))?;
        let config: Configuration = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML in {}", path.display()))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}

/// Write the default configuration to `path`.
///
/// An existing file is only replaced with `force`; otherwise the configuration is
/// printed instead.
pub fn run(path: &Path, force: bool) -> Result<()> {
    let config = toml::to_string_pretty(&Configuration::default())
        .with_context(|| "Failed to convert configuration to TOML")?;

    if path.exists() && !force {
        eprintln!(
            "{} already exists, use --force to override it. Configuration:",
            path.display()
        );
        println!("{config}");
    } else {
        std::fs::write(path, config).with_context(|| "Failed to write configuration file")?;
        eprintln!("{} written!", path.display());
    }
    Ok(())
}
