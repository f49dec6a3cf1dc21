// =============================================================================
// Update pipeline: load snapshot, fetch new candles, publish
// =============================================================================
//
// 1. Download the current snapshot and find its newest timestamp T.
// 2. Fetch candles from T + step up to `now`.
// 3. Nothing new  => report and stop, no upload.
//    Otherwise    => concatenate, write the CSV, publish a new version.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::info;

use crate::bitstamp::{CandleFetcher, OhlcSource};
use crate::dataset::{self, DatasetHost, VersionReceipt};
use crate::error::UpdateError;
use crate::runtime_config::UpdaterConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The exchange had no candles after the snapshot's newest row.
    NothingToUpdate,
    Published {
        /// Rows in the published file.
        rows: usize,
        /// Rows appended by this run.
        new_rows: usize,
        receipt: VersionReceipt,
    },
}

/// Run one update against `host` and `source`, treating `now` as the end of
/// the fetch window and the version timestamp.
pub async fn run<H: DatasetHost, S: OhlcSource>(
    config: &UpdaterConfig,
    host: &H,
    source: &S,
    now: DateTime<Local>,
) -> Result<Outcome> {
    // ── 1. Current snapshot ────────────────────────────────────────────────
    let current = dataset::load_snapshot(host, &config.dataset_slug, &config.download_dir).await?;
    let latest = current
        .max_timestamp()
        .ok_or_else(|| UpdateError::EmptySnapshot(config.dataset_slug.clone()))?;
    info!(dataset = %config.dataset_slug, rows = current.len(), latest, "snapshot loaded");

    // ── 2. Incremental fetch ───────────────────────────────────────────────
    let fetcher = CandleFetcher::new(config.step_secs, config.page_limit, config.page_pause());
    let fresh = fetcher
        .fetch_range(source, &config.pair, latest + config.step_secs, now.timestamp())
        .await
        .with_context(|| format!("failed to fetch {} candles after {latest}", config.pair))?;

    if fresh.is_empty() {
        info!("No new data available, nothing to update.");
        return Ok(Outcome::NothingToUpdate);
    }

    // ── 3. Merge, stage, publish ───────────────────────────────────────────
    let new_rows = fresh.len();
    let merged = current.concat(fresh);

    std::fs::create_dir_all(&config.upload_dir)
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;
    let csv_path = config.output_path();
    merged.write_csv(&csv_path)?;
    info!(path = %csv_path.display(), rows = merged.len(), new_rows, "combined dataset staged");

    let receipt = dataset::publish(
        host,
        &config.upload_dir,
        &config.dataset_slug,
        &config.dataset_title,
        &config.license,
        &dataset::version_notes_at(&now),
    )
    .await?;

    Ok(Outcome::Published {
        rows: merged.len(),
        new_rows,
        receipt,
    })
}
