use serde::Deserialize;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "LIVERY_INSTALLER_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "livery-installer.toml";
const COMMUNITY_DIR_ENV: &str = "LIVERY_INSTALLER_COMMUNITY_DIR";
const LOG_LEVEL_ENV: &str = "LIVERY_INSTALLER_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Community folder used when none is given on the command line
    pub community_dir: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            community_dir: None,
            log_level: String::from("info"),
        }
    }
}

impl Config {
    /// Load configuration from the TOML file named by
    /// `LIVERY_INSTALLER_CONFIG` (default `livery-installer.toml`), then apply
    /// environment variable overrides. A missing file means defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(COMMUNITY_DIR_ENV) {
            self.community_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup(LOG_LEVEL_ENV) {
            self.log_level = val;
        }
    }

    /// Pick the community folder: command line, then config, then the
    /// current directory.
    pub fn resolve_community_dir(&self, cli_value: Option<&Path>) -> PathBuf {
        cli_value
            .map(Path::to_path_buf)
            .or_else(|| self.community_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
