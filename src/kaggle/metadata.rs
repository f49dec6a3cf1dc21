use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// File name the hosting service expects next to the uploaded data.
pub const METADATA_FILE: &str = "dataset-metadata.json";

/// Descriptor written into the upload folder.  `id` is the `owner/slug` of
/// the dataset and decides which dataset a new version is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub title: String,
    pub id: String,
    #[serde(default)]
    pub licenses: Vec<License>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
}

impl DatasetMetadata {
    pub fn new(title: &str, id: &str, license: &str) -> Self {
        Self {
            title: title.to_string(),
            id: id.to_string(),
            licenses: vec![License {
                name: license.to_string(),
            }],
            subtitle: None,
            description: None,
        }
    }

    pub fn path_in(folder: &Path) -> PathBuf {
        folder.join(METADATA_FILE)
    }

    pub fn read(folder: &Path) -> Result<Self> {
        let path = Self::path_in(folder);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn write(&self, folder: &Path) -> Result<()> {
        let path = Self::path_in(folder);
        let content =
            serde_json::to_string_pretty(self).context("failed to serialise dataset metadata")?;
        std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Split `id` into `(owner, slug)`.
    pub fn owner_and_slug(&self) -> Result<(&str, &str)> {
        split_dataset_ref(&self.id)
    }
}

/// Write a fresh descriptor into `folder` unless one is already there.
///
/// Returns `true` when a new file was created.  An existing descriptor is
/// left untouched.
pub fn ensure_metadata(folder: &Path, slug: &str, title: &str, license: &str) -> Result<bool> {
    if DatasetMetadata::path_in(folder).exists() {
        return Ok(false);
    }
    DatasetMetadata::new(title, slug, license).write(folder)?;
    info!(folder = %folder.display(), id = slug, "dataset metadata created");
    Ok(true)
}

/// Split an `owner/slug` dataset reference.
pub fn split_dataset_ref(dataset: &str) -> Result<(&str, &str)> {
    match dataset.split_once('/') {
        Some((owner, slug)) if !owner.is_empty() && !slug.is_empty() && !slug.contains('/') => {
            Ok((owner, slug))
        }
        _ => anyhow::bail!("dataset reference '{dataset}' is not of the form owner/slug"),
    }
}
