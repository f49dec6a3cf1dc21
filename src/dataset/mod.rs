// =============================================================================
// Hosted dataset: snapshot loading and version publishing
// =============================================================================
//
// `DatasetHost` is the seam between the pipeline and the hosting service.
// The production implementation is `kaggle::KaggleClient`; tests substitute
// in-memory fakes.
// =============================================================================

pub mod loader;
pub mod publisher;

use std::path::Path;

use anyhow::Result;

/// Outcome of a successful "create new version" call.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionReceipt {
    /// `owner/slug` the version was attached to.
    pub dataset_ref: String,
    /// Page where version processing can be followed, when the service sends one.
    pub url: Option<String>,
}

/// Operations the pipeline needs from the dataset hosting service.
pub trait DatasetHost {
    /// Download every file of `dataset` (`owner/slug`) into `dest`, unpacking
    /// archives in place.
    async fn download_files(&self, dataset: &str, dest: &Path) -> Result<()>;

    /// Publish the contents of `folder` (which must hold a metadata
    /// descriptor) as a new version of the dataset it names.
    async fn create_version(
        &self,
        folder: &Path,
        version_notes: &str,
        delete_old_versions: bool,
    ) -> Result<VersionReceipt>;
}

pub use loader::load_snapshot;
pub use publisher::{publish, version_notes_at};
