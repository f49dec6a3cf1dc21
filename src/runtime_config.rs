// =============================================================================
// Runtime Configuration: parameters for a single update run
// =============================================================================
//
// Every field carries a serde default equal to the values the job has always
// used, so an empty or partial JSON file (or no file at all) still yields a
// complete configuration.
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "UPDATER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "updater_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_pair() -> String {
    "ethusd".to_string()
}

fn default_step_secs() -> i64 {
    60
}

fn default_page_limit() -> u32 {
    1000
}

fn default_page_pause_ms() -> u64 {
    1000
}

fn default_dataset_slug() -> String {
    "viniciusqroz/ethereum-historical-data".to_string()
}

fn default_dataset_title() -> String {
    "Ethereum Historical Data".to_string()
}

fn default_license() -> String {
    "CC0-1.0".to_string()
}

fn default_output_file_name() -> String {
    "ethusd_1min_ohlc.csv".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("temp_download")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("temp_upload")
}

fn default_bitstamp_base_url() -> String {
    "https://www.bitstamp.net/api/v2".to_string()
}

fn default_kaggle_base_url() -> String {
    "https://www.kaggle.com/api/v1".to_string()
}

fn default_http_timeout_secs() -> u64 {
    600
}

// =============================================================================
// UpdaterConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    // --- Exchange -----------------------------------------------------------

    /// Bitstamp pair identifier, lower-case (e.g. `ethusd`).
    #[serde(default = "default_pair")]
    pub pair: String,

    /// Candle interval in seconds.
    #[serde(default = "default_step_secs")]
    pub step_secs: i64,

    /// Maximum candles requested per page.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Pause between consecutive page requests, in milliseconds.
    #[serde(default = "default_page_pause_ms")]
    pub page_pause_ms: u64,

    #[serde(default = "default_bitstamp_base_url")]
    pub bitstamp_base_url: String,

    // --- Hosted dataset -----------------------------------------------------

    /// `owner/slug` of the hosted dataset.
    #[serde(default = "default_dataset_slug")]
    pub dataset_slug: String,

    /// Title written into a freshly created metadata descriptor.
    #[serde(default = "default_dataset_title")]
    pub dataset_title: String,

    /// License name written into a freshly created metadata descriptor.
    #[serde(default = "default_license")]
    pub license: String,

    /// File name of the combined CSV inside the upload directory.
    #[serde(default = "default_output_file_name")]
    pub output_file_name: String,

    #[serde(default = "default_kaggle_base_url")]
    pub kaggle_base_url: String,

    // --- Local scratch space ------------------------------------------------

    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Request timeout for both HTTP clients.  Generous because the dataset
    /// archive download can be large.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            pair: default_pair(),
            step_secs: default_step_secs(),
            page_limit: default_page_limit(),
            page_pause_ms: default_page_pause_ms(),
            bitstamp_base_url: default_bitstamp_base_url(),
            dataset_slug: default_dataset_slug(),
            dataset_title: default_dataset_title(),
            license: default_license(),
            output_file_name: default_output_file_name(),
            kaggle_base_url: default_kaggle_base_url(),
            download_dir: default_download_dir(),
            upload_dir: default_upload_dir(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl UpdaterConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// Fails when the file is unreadable or does not parse; see
    /// [`UpdaterConfig::load_or_default`] for the missing-file fallback.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read updater config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse updater config from {}", path.display()))?;

        info!(
            path = %path.display(),
            pair = %config.pair,
            dataset = %config.dataset_slug,
            "updater config loaded"
        );

        Ok(config)
    }

    /// Like [`UpdaterConfig::load`], but a file that does not exist yields
    /// the defaults.  A file that exists and fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Resolve the config the way `main` does: file named by
    /// `UPDATER_CONFIG` (or the default path), defaults when that file is
    /// absent, then environment overrides on top.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

        let mut config = Self::load_or_default(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `OHLC_PAIR` / `KAGGLE_DATASET` overrides from `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(pair) = lookup("OHLC_PAIR").map(|p| p.trim().to_lowercase()) {
            if !pair.is_empty() {
                self.pair = pair;
            }
        }
        if let Some(slug) = lookup("KAGGLE_DATASET").map(|s| s.trim().to_string()) {
            if !slug.is_empty() {
                self.dataset_slug = slug;
            }
        }
    }

    pub fn page_pause(&self) -> Duration {
        Duration::from_millis(self.page_pause_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Full path of the combined CSV inside the upload directory.
    pub fn output_path(&self) -> PathBuf {
        self.upload_dir.join(&self.output_file_name)
    }
}
