use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::system::DEFAULT_AUTOLOGIN_CONFIG;

/// Settings read from `config.toml`. Every field has a default, so a missing
/// file or a partial one is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display-manager configuration patched by the auto-login operation
    pub autologin_config: PathBuf,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autologin_config: PathBuf::from(DEFAULT_AUTOLOGIN_CONFIG),
            color: true,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Unable to determine user config directory")?
            .join("acctctl")
            .join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Ok(path) => path,
                // No config directory (e.g. no HOME); fall back to defaults.
                Err(_) => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("parsing config at {}", path.display()))
    }
}
