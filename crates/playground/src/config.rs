//! Playground configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Values in a TOML file passed with `--config`
//! 2. Environment variable overrides (e.g. `CTP_COMPILE_URL`)
//! 3. Built-in defaults (Compiler Explorer, local parser)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Compiler Explorer compile API root. The compiler id and `/compile` are appended.
const DEFAULT_COMPILE_URL: &str = "https://godbolt.org/api/compiler";
const DEFAULT_SHORTENER_URL: &str = "https://viatorus.pythonanywhere.com/short";
const DEFAULT_SHARE_BASE_URL: &str = "https://viatorus.github.io/compile-time-printer/";
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_SPINNER_DELAY_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_COMPILE_URL: &str = "CTP_COMPILE_URL";
const ENV_PARSE_URL: &str = "CTP_PARSE_URL";
const ENV_SHORTENER_URL: &str = "CTP_SHORTENER_URL";
const ENV_SHARE_BASE_URL: &str = "CTP_SHARE_BASE_URL";
const ENV_STORAGE_DIR: &str = "CTP_STORAGE_DIR";

/// Top-level playground configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    pub compile_url: String,
    /// Remote parse service. `None` runs the diagnostic parser in-process.
    pub parse_url: Option<String>,
    pub shortener_url: String,
    /// Page URL the share fragment is appended to.
    pub share_base_url: String,
    /// Directory backing local persistence (one file per state key).
    pub storage_dir: PathBuf,
    /// Quiet period after the last edit before compiling.
    pub debounce_ms: u64,
    /// Delay before the loading indicator replaces stale output.
    pub spinner_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            compile_url: std::env::var(ENV_COMPILE_URL)
                .unwrap_or_else(|_| DEFAULT_COMPILE_URL.into()),
            parse_url: std::env::var(ENV_PARSE_URL).ok(),
            shortener_url: std::env::var(ENV_SHORTENER_URL)
                .unwrap_or_else(|_| DEFAULT_SHORTENER_URL.into()),
            share_base_url: std::env::var(ENV_SHARE_BASE_URL)
                .unwrap_or_else(|_| DEFAULT_SHARE_BASE_URL.into()),
            storage_dir: std::env::var(ENV_STORAGE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_storage_dir()),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            spinner_delay_ms: DEFAULT_SPINNER_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl PlaygroundConfig {
    /// Load the configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse playground config TOML")
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn spinner_delay(&self) -> Duration {
        Duration::from_millis(self.spinner_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ctp-playground")
}
