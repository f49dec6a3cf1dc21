use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::dataset::DatasetHost;
use crate::error::UpdateError;
use crate::market_data::CandleTable;

/// Download the current published snapshot of `dataset` into `scratch_dir`
/// and parse its first CSV file.
pub async fn load_snapshot<H: DatasetHost>(
    host: &H,
    dataset: &str,
    scratch_dir: &Path,
) -> Result<CandleTable> {
    std::fs::create_dir_all(scratch_dir)
        .with_context(|| format!("failed to create {}", scratch_dir.display()))?;

    host.download_files(dataset, scratch_dir)
        .await
        .with_context(|| format!("failed to download dataset {dataset}"))?;

    let csv_path = first_csv(scratch_dir)?
        .ok_or_else(|| UpdateError::MissingDataFile(scratch_dir.to_path_buf()))?;

    info!(dataset, file = %csv_path.display(), "using snapshot file");
    CandleTable::read_csv(&csv_path)
}

/// First `*.csv` file (by name) directly inside `dir`.
pub fn first_csv(dir: &Path) -> Result<Option<PathBuf>> {
    let mut found = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?
    {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found.into_iter().next())
}
