// =============================================================================
// OHLC Dataset Updater: Main Entry Point
// =============================================================================
//
// One-shot batch job: pull the published dataset, append the candles the
// exchange has produced since its newest row, and push the result back as a
// new version.  Any error aborts the run.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod bitstamp;
mod dataset;
mod error;
mod kaggle;
mod market_data;
mod pipeline;
mod runtime_config;
#[cfg(test)]
mod test_support;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::bitstamp::BitstampClient;
use crate::kaggle::{KaggleClient, KaggleCredentials};
use crate::pipeline::Outcome;
use crate::runtime_config::UpdaterConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = UpdaterConfig::from_env()?;
    info!(
        pair = %config.pair,
        step_secs = config.step_secs,
        dataset = %config.dataset_slug,
        "OHLC dataset updater starting"
    );

    // ── 2. Clients ───────────────────────────────────────────────────────
    let credentials = KaggleCredentials::resolve()?;
    let kaggle = KaggleClient::new(&config.kaggle_base_url, credentials, config.http_timeout())?;
    let bitstamp = BitstampClient::new(&config.bitstamp_base_url, config.http_timeout())?;

    // ── 3. Run ───────────────────────────────────────────────────────────
    match pipeline::run(&config, &kaggle, &bitstamp, chrono::Local::now()).await? {
        Outcome::NothingToUpdate => {}
        Outcome::Published {
            rows,
            new_rows,
            receipt,
        } => {
            info!(
                dataset = %receipt.dataset_ref,
                url = receipt.url.as_deref().unwrap_or("-"),
                rows,
                new_rows,
                "Dataset '{}' updated successfully.",
                config.dataset_slug
            );
        }
    }

    Ok(())
}
