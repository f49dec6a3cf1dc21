// =============================================================================
// Updater errors: the fatal failure kinds the pipeline can raise
// =============================================================================
//
// Everything else (I/O, JSON, CSV, zip) travels as a plain `anyhow::Error`
// with context attached at the call site.  These variants exist so callers
// and tests can tell the named failure kinds apart via `downcast_ref`.
// =============================================================================

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("no CSV file found in dataset download at {0}")]
    MissingDataFile(PathBuf),

    #[error("upload folder {0} not found")]
    UploadFolderMissing(PathBuf),

    #[error("{endpoint} returned {status}: {body}")]
    HttpStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("dataset {0} has no rows to resume from")]
    EmptySnapshot(String),

    #[error("new version of {dataset} rejected: {message}")]
    VersionRejected { dataset: String, message: String },

    #[error("Kaggle credentials not found (set KAGGLE_USERNAME/KAGGLE_KEY or provide kaggle.json)")]
    MissingCredentials,
}

impl UpdateError {
    /// Build an [`UpdateError::HttpStatus`] from a failed response, consuming
    /// the body for the error message.
    pub async fn from_response(endpoint: impl Into<String>, resp: reqwest::Response) -> Self {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
            body,
        }
    }
}
