// =============================================================================
// Kaggle credentials: username + API key for HTTP basic auth
// =============================================================================
//
// Resolution order:
//   1. KAGGLE_USERNAME + KAGGLE_KEY environment variables
//   2. kaggle.json in KAGGLE_CONFIG_DIR
//   3. kaggle.json in $HOME/.kaggle
//
// SECURITY: the key is never logged; `Debug` redacts it.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::error::UpdateError;

const CREDENTIALS_FILE: &str = "kaggle.json";

#[derive(Clone, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    key: String,
}

impl KaggleCredentials {
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolve credentials from the process environment.
    pub fn resolve() -> Result<Self> {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    fn resolve_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let (Some(username), Some(key)) = (lookup("KAGGLE_USERNAME"), lookup("KAGGLE_KEY")) {
            debug!(username = %username, "Kaggle credentials taken from environment");
            return Ok(Self::new(username, key));
        }

        let dir = lookup("KAGGLE_CONFIG_DIR")
            .map(PathBuf::from)
            .or_else(|| {
                lookup("HOME")
                    .or_else(|| lookup("USERPROFILE"))
                    .map(|home| Path::new(&home).join(".kaggle"))
            })
            .ok_or(UpdateError::MissingCredentials)?;

        let path = dir.join(CREDENTIALS_FILE);
        if !path.is_file() {
            return Err(UpdateError::MissingCredentials.into());
        }
        Self::from_file(&path)
    }

    /// Read a `{"username": ..., "key": ...}` credentials file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let creds: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        debug!(path = %path.display(), username = %creds.username, "Kaggle credentials loaded");
        Ok(creds)
    }
}

impl std::fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}
