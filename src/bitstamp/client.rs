// =============================================================================
// Bitstamp REST API Client: public OHLC endpoint
// =============================================================================
//
// Only the unauthenticated `GET /ohlc/{pair}/` endpoint is used.  Pagination
// is driven by the caller through the `start` parameter; this client fetches
// exactly one page per call.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::bitstamp::fetcher::OhlcSource;
use crate::error::UpdateError;
use crate::market_data::Candle;

/// Bitstamp public market-data client.
#[derive(Debug, Clone)]
pub struct BitstampClient {
    base_url: String,
    client: reqwest::Client,
}

impl BitstampClient {
    /// Create a client against `base_url` (e.g. `https://www.bitstamp.net/api/v2`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client for BitstampClient")?;

        debug!(base_url = %base_url, "BitstampClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET /ohlc/{pair}/?step&limit&start (public).
    ///
    /// Returns up to `limit` candles beginning at `start`, oldest first.
    #[instrument(skip(self), name = "bitstamp::get_ohlc")]
    pub async fn get_ohlc(
        &self,
        pair: &str,
        start: i64,
        step: i64,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/ohlc/{}/", self.base_url, pair);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("step", step.to_string()),
                ("limit", limit.to_string()),
                ("start", start.to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("GET /ohlc/{pair}/ request failed"))?;

        if !resp.status().is_success() {
            return Err(UpdateError::from_response(format!("Bitstamp GET /ohlc/{pair}/"), resp)
                .await
                .into());
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse ohlc response")?;

        let candles = parse_ohlc_page(&body)?;
        debug!(pair, start, count = candles.len(), "ohlc page fetched");
        Ok(candles)
    }
}

impl OhlcSource for BitstampClient {
    async fn fetch_page(&self, pair: &str, start: i64, step: i64, limit: u32) -> Result<Vec<Candle>> {
        self.get_ohlc(pair, start, step, limit).await
    }
}

/// Extract `data.ohlc` from an OHLC response body.
///
/// Expected shape:
/// ```json
/// { "data": { "pair": "ETH/USD", "ohlc": [ { "timestamp": "...", ... } ] } }
/// ```
pub fn parse_ohlc_page(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body["data"]["ohlc"]
        .as_array()
        .with_context(|| format!("ohlc response missing data.ohlc array: {body}"))?;

    raw.iter()
        .enumerate()
        .map(|(i, entry)| Candle::from_json(entry).with_context(|| format!("ohlc entry {i}")))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
