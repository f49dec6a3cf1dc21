use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, TimeZone};
use tracing::info;

use crate::dataset::{DatasetHost, VersionReceipt};
use crate::error::UpdateError;
use crate::kaggle::metadata::ensure_metadata;

/// Human-readable version note stamped with `at`.
pub fn version_notes_at<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Dataset updated on {}", at.format("%Y-%m-%d %H:%M:%S"))
}

/// Publish `folder` as a new version of `slug`, replacing every earlier
/// version.
///
/// A metadata descriptor is created first when the folder lacks one.  Old
/// versions are deleted by the host as part of the call; nothing is rolled
/// back if it fails.
pub async fn publish<H: DatasetHost>(
    host: &H,
    folder: &Path,
    slug: &str,
    title: &str,
    license: &str,
    version_notes: &str,
) -> Result<VersionReceipt> {
    if !folder.exists() {
        return Err(UpdateError::UploadFolderMissing(folder.to_path_buf()).into());
    }

    ensure_metadata(folder, slug, title, license)?;

    let receipt = host.create_version(folder, version_notes, true).await?;
    info!(dataset = slug, notes = version_notes, "new version requested");
    Ok(receipt)
}
