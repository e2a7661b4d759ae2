//! Store configuration: where the remote data store lives and how to
//! authenticate against it.
//!
//! Resolution order: `TEAMBOARD_URL` / `TEAMBOARD_API_KEY` environment
//! variables, then `~/.config/teamboard/config.json` (written by
//! `tb init`). The API key is the store's anon/service key sent as both
//! the `apikey` header and the bearer token.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const URL_ENV: &str = "TEAMBOARD_URL";
pub const API_KEY_ENV: &str = "TEAMBOARD_API_KEY";

/// Connection settings for the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
}

impl StoreConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        StoreConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Load configuration from the environment, falling back to the
    /// config file.
    pub fn load() -> Result<Self> {
        if let (Ok(url), Ok(key)) = (std::env::var(URL_ENV), std::env::var(API_KEY_ENV)) {
            return Ok(StoreConfig::new(&url, &key));
        }
        let path = config_path()?;
        if !path.exists() {
            return Err(Error::Config(format!(
                "no store configured; set {URL_ENV}/{API_KEY_ENV} or run `tb init`"
            )));
        }
        let raw = fs::read_to_string(&path)?;
        let cfg: StoreConfig = serde_json::from_str(&raw)?;
        Ok(cfg)
    }

    /// Write configuration to the config file, creating the directory
    /// if needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// Path of the config file: `<config dir>/teamboard/config.json`.
pub fn config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| Error::Config("could not determine the user config directory".into()))?;
    Ok(dir.join("teamboard").join("config.json"))
}
