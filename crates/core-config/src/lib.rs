//! Configuration loading and parsing.
//!
//! `grit.toml` is looked up in the working directory first, then in the
//! platform config dir (`<config>/grit/grit.toml`). Unknown fields are
//! ignored so the file format can grow without breaking older binaries.
//! A missing file yields the defaults; a malformed file is an error the
//! binary reports and ignores.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
pub struct FillConfig {
    /// Default fill-region target width in visual cells.
    #[serde(default = "FillConfig::default_width")]
    pub width: usize,
}

impl FillConfig {
    const fn default_width() -> usize {
        80
    }
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SaveConfig {
    /// Run presave cleanup (strip trailing whitespace, collapse trailing
    /// empty lines, ensure one trailing newline) unless a raw save is
    /// requested explicitly.
    #[serde(default = "SaveConfig::default_cleanup")]
    pub cleanup: bool,
}

impl SaveConfig {
    const fn default_cleanup() -> bool {
        true
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            cleanup: Self::default_cleanup(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub fill: FillConfig,
    #[serde(default)]
    pub save: SaveConfig,
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("grit.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("grit").join("grit.toml");
    }
    PathBuf::from("grit.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    match fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: Config = toml::from_str(&content)?;
            info!(target: "config", file = %path.display(), "config loaded");
            Ok(cfg)
        }
        Err(_) => Ok(Config::default()),
    }
}
