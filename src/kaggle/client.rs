// =============================================================================
// Kaggle REST API Client: dataset download and new-version upload
// =============================================================================
//
// All API calls use HTTP basic auth with the account username and API key.
// Publishing a version is a three-step exchange:
//   1. POST /datasets/upload/file/{length}/{mtime}   -> { token, createUrl }
//   2. PUT  <createUrl>                               (raw file bytes)
//   3. POST /datasets/create/version/{owner}/{slug}  (tokens + notes)
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::dataset::{DatasetHost, VersionReceipt};
use crate::error::UpdateError;
use crate::kaggle::archive;
use crate::kaggle::credentials::KaggleCredentials;
use crate::kaggle::metadata::{split_dataset_ref, DatasetMetadata, METADATA_FILE};

/// Kaggle REST API client.
#[derive(Clone)]
pub struct KaggleClient {
    base_url: String,
    credentials: KaggleCredentials,
    client: reqwest::Client,
}

// -----------------------------------------------------------------------------
// Wire types
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileUploadInfo {
    token: String,
    create_url: String,
}

#[derive(Debug, Serialize)]
struct UploadToken {
    token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewVersionRequest {
    version_notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    files: Vec<UploadToken>,
    convert_to_csv: bool,
    category_ids: Vec<String>,
    delete_old_versions: bool,
}

#[derive(Debug, Default, Deserialize)]
struct NewVersionResponse {
    #[serde(rename = "ref", default)]
    dataset_ref: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl KaggleClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against `base_url` (e.g. `https://www.kaggle.com/api/v1`).
    pub fn new(
        base_url: impl Into<String>,
        credentials: KaggleCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client for KaggleClient")?;

        debug!(base_url = %base_url, username = %credentials.username, "KaggleClient initialised");

        Ok(Self {
            base_url,
            credentials,
            client,
        })
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.basic_auth(&self.credentials.username, Some(self.credentials.key()))
    }

    // -------------------------------------------------------------------------
    // Download
    // -------------------------------------------------------------------------

    /// GET /datasets/download/{owner}/{slug}.
    ///
    /// The body is streamed to `{dest}/{slug}.zip` and unpacked there; the
    /// archive is removed afterwards.  A body that is not a zip is kept as
    /// `{dest}/{slug}.csv`.
    #[instrument(skip(self), name = "kaggle::download_dataset_files")]
    pub async fn download_dataset_files(&self, dataset: &str, dest: &Path) -> Result<()> {
        let (owner, slug) = split_dataset_ref(dataset)?;

        tokio::fs::create_dir_all(dest)
            .await
            .with_context(|| format!("failed to create {}", dest.display()))?;

        let url = format!("{}/datasets/download/{owner}/{slug}", self.base_url);
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .context("GET /datasets/download request failed")?;

        if !resp.status().is_success() {
            return Err(UpdateError::from_response(
                format!("Kaggle GET /datasets/download/{dataset}"),
                resp,
            )
            .await
            .into());
        }

        let archive_path = dest.join(format!("{slug}.zip"));
        let mut file = tokio::fs::File::create(&archive_path)
            .await
            .with_context(|| format!("failed to create {}", archive_path.display()))?;

        let mut stream = resp.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("dataset download interrupted")?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("failed to write {}", archive_path.display()))?;
            written += chunk.len() as u64;
        }
        file.flush().await.context("failed to flush dataset download")?;
        drop(file);

        info!(dataset, bytes = written, "dataset downloaded");

        if archive::is_zip(&archive_path)? {
            archive::extract_zip(&archive_path, dest)?;
            tokio::fs::remove_file(&archive_path)
                .await
                .with_context(|| format!("failed to remove {}", archive_path.display()))?;
        } else {
            let plain = dest.join(format!("{slug}.csv"));
            warn!(path = %plain.display(), "download is not a zip archive, keeping it as a plain file");
            tokio::fs::rename(&archive_path, &plain)
                .await
                .with_context(|| format!("failed to rename download to {}", plain.display()))?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Upload
    // -------------------------------------------------------------------------

    /// Upload one file and return the token that references it in a version
    /// request.
    #[instrument(skip(self), name = "kaggle::upload_file")]
    async fn upload_file(&self, path: &Path) -> Result<String> {
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("failed to stat {}", path.display()))?;
        let content_length = meta.len();
        let last_modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("upload path {} has no usable file name", path.display()))?;

        let url = format!(
            "{}/datasets/upload/file/{content_length}/{last_modified}",
            self.base_url
        );
        let resp = self
            .authed(self.client.post(&url))
            .form(&[("fileName", file_name)])
            .send()
            .await
            .context("POST /datasets/upload/file request failed")?;

        if !resp.status().is_success() {
            return Err(UpdateError::from_response("Kaggle POST /datasets/upload/file", resp)
                .await
                .into());
        }

        let info: FileUploadInfo = resp
            .json()
            .await
            .context("failed to parse upload/file response")?;

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        let resp = self
            .client
            .put(&info.create_url)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("PUT of {file_name} failed"))?;

        if !resp.status().is_success() {
            return Err(UpdateError::from_response(format!("Kaggle PUT {file_name}"), resp)
                .await
                .into());
        }

        info!(file = file_name, bytes = content_length, "file uploaded");
        Ok(info.token)
    }

    /// POST /datasets/create/version/{owner}/{slug} for the dataset named in
    /// `folder`'s metadata descriptor.
    #[instrument(skip(self), name = "kaggle::dataset_create_version")]
    pub async fn dataset_create_version(
        &self,
        folder: &Path,
        version_notes: &str,
        delete_old_versions: bool,
    ) -> Result<VersionReceipt> {
        if !folder.is_dir() {
            return Err(UpdateError::UploadFolderMissing(folder.to_path_buf()).into());
        }

        let meta = DatasetMetadata::read(folder)?;
        let (owner, slug) = meta.owner_and_slug()?;

        let mut files = Vec::new();
        for path in upload_candidates(folder)? {
            files.push(UploadToken {
                token: self.upload_file(&path).await?,
            });
        }

        let request = NewVersionRequest {
            version_notes: version_notes.to_string(),
            subtitle: meta.subtitle.clone(),
            description: meta.description.clone(),
            files,
            convert_to_csv: true,
            category_ids: Vec::new(),
            delete_old_versions,
        };

        let url = format!("{}/datasets/create/version/{owner}/{slug}", self.base_url);
        let resp = self
            .authed(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .context("POST /datasets/create/version request failed")?;

        if !resp.status().is_success() {
            return Err(UpdateError::from_response(
                format!("Kaggle POST /datasets/create/version/{owner}/{slug}"),
                resp,
            )
            .await
            .into());
        }

        let body: NewVersionResponse = resp
            .json()
            .await
            .context("failed to parse create/version response")?;

        let receipt = receipt_from_response(&meta.id, body)?;
        info!(
            dataset = %receipt.dataset_ref,
            url = receipt.url.as_deref().unwrap_or("-"),
            files = request.files.len(),
            delete_old_versions,
            "dataset version is being created"
        );
        Ok(receipt)
    }
}

impl DatasetHost for KaggleClient {
    async fn download_files(&self, dataset: &str, dest: &Path) -> Result<()> {
        self.download_dataset_files(dataset, dest).await
    }

    async fn create_version(
        &self,
        folder: &Path,
        version_notes: &str,
        delete_old_versions: bool,
    ) -> Result<VersionReceipt> {
        self.dataset_create_version(folder, version_notes, delete_old_versions)
            .await
    }
}

impl std::fmt::Debug for KaggleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaggleClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Internal helpers
// -----------------------------------------------------------------------------

/// Regular files in `folder` other than the metadata descriptor, sorted by name.
fn upload_candidates(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)
        .with_context(|| format!("failed to list {}", folder.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() || entry.file_name() == METADATA_FILE {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

fn receipt_from_response(dataset: &str, body: NewVersionResponse) -> Result<VersionReceipt> {
    let status = body.status.unwrap_or_default();
    if !status.eq_ignore_ascii_case("ok") {
        let message = body
            .error
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("status '{status}'"));
        return Err(UpdateError::VersionRejected {
            dataset: dataset.to_string(),
            message,
        }
        .into());
    }

    Ok(VersionReceipt {
        dataset_ref: body.dataset_ref.unwrap_or_else(|| dataset.to_string()),
        url: body.url,
    })
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScratchDir;

    fn scratch_dir() -> ScratchDir {
        ScratchDir::new("kaggle-client")
    }

    #[test]
    fn new_version_request_uses_api_field_names() {
        let req = NewVersionRequest {
            version_notes: "Dataset updated on 2026-10-17 12:00:00".into(),
            subtitle: None,
            description: None,
            files: vec![UploadToken { token: "tok-1".into() }],
            convert_to_csv: true,
            category_ids: Vec::new(),
            delete_old_versions: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["versionNotes"], "Dataset updated on 2026-10-17 12:00:00");
        assert_eq!(json["files"][0]["token"], "tok-1");
        assert_eq!(json["convertToCsv"], true);
        assert_eq!(json["deleteOldVersions"], true);
        assert!(json.get("subtitle").is_none());
    }

    #[test]
    fn upload_info_parses_camel_case() {
        let info: FileUploadInfo =
            serde_json::from_str(r#"{"token": "abc", "createUrl": "https://upload.example/abc"}"#)
                .unwrap();
        assert_eq!(info.token, "abc");
        assert_eq!(info.create_url, "https://upload.example/abc");
    }

    #[test]
    fn ok_response_becomes_receipt() {
        let body: NewVersionResponse = serde_json::from_str(
            r#"{"ref": "owner/eth", "url": "https://www.kaggle.com/owner/eth", "status": "ok", "error": ""}"#,
        )
        .unwrap();
        let receipt = receipt_from_response("owner/eth", body).unwrap();
        assert_eq!(receipt.dataset_ref, "owner/eth");
        assert_eq!(receipt.url.as_deref(), Some("https://www.kaggle.com/owner/eth"));
    }

    #[test]
    fn error_response_is_version_rejected() {
        let body: NewVersionResponse =
            serde_json::from_str(r#"{"status": "error", "error": "Dataset not found"}"#).unwrap();
        let err = receipt_from_response("owner/eth", body).unwrap_err();
        match err.downcast_ref::<UpdateError>() {
            Some(UpdateError::VersionRejected { dataset, message }) => {
                assert_eq!(dataset, "owner/eth");
                assert_eq!(message, "Dataset not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_status_is_rejected() {
        let err = receipt_from_response("owner/eth", NewVersionResponse::default()).unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn upload_candidates_skip_metadata_and_dirs() {
        let dir = scratch_dir();
        std::fs::write(dir.join("b.csv"), "x").unwrap();
        std::fs::write(dir.join("a.csv"), "x").unwrap();
        std::fs::write(dir.join(METADATA_FILE), "{}").unwrap();
        std::fs::create_dir(dir.join("nested")).unwrap();

        let files = upload_candidates(&dir).unwrap();
        assert_eq!(files, vec![dir.join("a.csv"), dir.join("b.csv")]);
    }

    #[tokio::test]
    async fn create_version_requires_folder() {
        let client = KaggleClient::new(
            "http://127.0.0.1:9",
            KaggleCredentials::new("user", "key"),
            Duration::from_secs(1),
        )
        .unwrap();
        let missing = ScratchDir::unborn("no-such");

        let err = client
            .dataset_create_version(missing.path(), "notes", true)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UpdateError>(),
            Some(UpdateError::UploadFolderMissing(p)) if p == missing.path()
        ));
    }
}
