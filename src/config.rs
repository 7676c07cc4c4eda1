//! Configuration file handling.
//!
//! This module provides loading and saving of mwsite configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is read from `$MWSITE_CONFIG` when set, otherwise:
//! - Linux: `~/.config/mwsite/config.toml`
//! - macOS: `~/Library/Application Support/mwsite/config.toml`
//! - Windows: `%APPDATA%\mwsite\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! port = 3000
//! mode = "production"
//! site_name = "tinyhttp"
//! static_dir = "static"
//! listing_url = "https://api.github.com/repos/talentlessguy/tinyhttp/contents/packages"
//! registry_url = "https://registry.npmjs.org/@tinyhttp"
//! request_timeout_secs = 30
//! disk_cache = true
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default listening port when neither the config nor `PORT` sets one.
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime mode; governs caching headers on static assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Mode::Production
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            _ => Err(format!(
                "Unknown mode: {}. Use 'development' or 'production'",
                s
            )),
        }
    }
}

/// Application configuration.
///
/// # Example
///
/// ```no_run
/// use mwsite::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Port: {}", config.port);
/// println!("Mode: {}", config.mode);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the server listens on.
    ///
    /// Default: 3000
    pub port: u16,

    /// Runtime mode.
    ///
    /// Default: development
    pub mode: Mode,

    /// Site name appended to package page titles.
    ///
    /// Default: "tinyhttp"
    pub site_name: String,

    /// Directory holding static assets, markdown pages and `404.html`.
    ///
    /// Default: "static"
    pub static_dir: PathBuf,

    /// Contents API endpoint listing every middleware package.
    pub listing_url: String,

    /// Registry base URL; a package record lives at `<registry_url>/<name>`.
    pub registry_url: String,

    /// Sent with every upstream request. GitHub rejects requests without one.
    pub user_agent: String,

    /// Upstream request timeout in seconds. `0` disables the timeout.
    ///
    /// Default: 30
    pub request_timeout_secs: u64,

    /// Whether cached responses are persisted to disk.
    ///
    /// Default: true
    pub disk_cache: bool,

    /// Override for the response cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            mode: Mode::Development,
            site_name: "tinyhttp".to_string(),
            static_dir: PathBuf::from("static"),
            listing_url: "https://api.github.com/repos/talentlessguy/tinyhttp/contents/packages"
                .to_string(),
            registry_url: "https://registry.npmjs.org/@tinyhttp".to_string(),
            user_agent: format!("mwsite/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            disk_cache: true,
            cache_dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from the default config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to `path`.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use mwsite::Config;
    ///
    /// let path = Config::config_path();
    /// println!("Config file: {}", path.display());
    /// ```
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os("MWSITE_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mwsite")
            .join("config.toml")
    }

    /// Directory used for the on-disk response cache, if enabled.
    pub fn effective_cache_dir(&self) -> Option<PathBuf> {
        if !self.disk_cache {
            return None;
        }
        Some(
            self.cache_dir
                .clone()
                .unwrap_or_else(crate::cache::Cache::default_dir),
        )
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
