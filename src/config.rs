//! Configuration for the cafe service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "cafes.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Shared secret required by the report-closed endpoint
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Directory with the landing page and other static assets
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            api_key: None,
            http_port: default_http_port(),
            static_dir: None,
        }
    }
}

impl Config {
    /// Load config from `path` (or `cafes.toml` if present), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_file(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Override fields from `CAFES_*` variables resolved through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CAFES_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(key) = lookup("CAFES_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(port) = lookup("CAFES_PORT") {
            self.http_port = port
                .parse()
                .map_err(|_| Error::Config(format!("CAFES_PORT is not a valid port: {}", port)))?;
        }
        if let Some(dir) = lookup("CAFES_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// The configured API key, or an error when none is set
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::Config(
                "No API key configured. Set `api_key` in the config file or CAFES_API_KEY.".into(),
            )),
        }
    }

    /// Save config to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }
}

// Default value functions

fn default_database_path() -> PathBuf {
    PathBuf::from("cafes.db")
}

fn default_http_port() -> u16 {
    3000
}
