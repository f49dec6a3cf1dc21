// =============================================================================
// Incremental candle fetcher: cursor-driven pagination over an OHLC source
// =============================================================================
//
// Loop:
//   while cursor < end:
//       page = source.fetch_page(cursor)       (up to `limit` candles)
//       if page is empty  => stop
//       drop candles older than cursor (stale rows never reach the table)
//       if nothing is left, or last + step <= cursor  => stop
//       cursor = last(page).timestamp + step
//       sleep(pause)                            (flat rate-limit courtesy)
//
// Any error from the source aborts the whole fetch; there is no retry.
// =============================================================================

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::market_data::{Candle, CandleTable};

/// One page of candles starting at a cursor.
pub trait OhlcSource {
    async fn fetch_page(&self, pair: &str, start: i64, step: i64, limit: u32) -> Result<Vec<Candle>>;
}

/// Paging parameters for [`CandleFetcher::fetch_range`].
#[derive(Debug, Clone, Copy)]
pub struct CandleFetcher {
    pub step: i64,
    pub limit: u32,
    pub pause: Duration,
}

impl CandleFetcher {
    pub fn new(step: i64, limit: u32, pause: Duration) -> Self {
        Self { step, limit, pause }
    }

    /// Fetch every candle in `[start_ts, end_ts)` from `source`.
    ///
    /// Returns an empty table when `start_ts >= end_ts` (no request is made)
    /// or when the first page is empty.  Timestamps in the result are strictly
    /// increasing: a page that does not move the cursor forward is discarded.
    pub async fn fetch_range<S: OhlcSource>(
        &self,
        source: &S,
        pair: &str,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<CandleTable> {
        let mut table = CandleTable::new();
        let mut cursor = start_ts;
        let mut pages = 0u32;

        while cursor < end_ts {
            let page = source.fetch_page(pair, cursor, self.step, self.limit).await?;
            if page.is_empty() {
                debug!(pair, cursor, "empty page, stopping");
                break;
            }

            let received = page.len();
            let mut last_kept = table.candles().last().map(|c| c.timestamp);
            let fresh: Vec<Candle> = page
                .into_iter()
                .filter(|c| {
                    let keep = c.timestamp >= cursor && last_kept.map_or(true, |t| c.timestamp > t);
                    if keep {
                        last_kept = Some(c.timestamp);
                    }
                    keep
                })
                .collect();

            let next = match fresh.last() {
                Some(last) => last.timestamp + self.step,
                None => cursor,
            };
            if next <= cursor {
                warn!(pair, cursor, next, received, "page did not advance the cursor, stopping");
                break;
            }

            pages += 1;
            debug!(pair, cursor, next, count = fresh.len(), dropped = received - fresh.len(), "page received");
            table.extend(fresh);
            cursor = next;

            tokio::time::sleep(self.pause).await;
        }

        info!(pair, pages, rows = table.len(), "incremental fetch complete");
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory exchange: serves `limit` candles at or after `start`.
    struct FakeExchange {
        candles: Vec<Candle>,
        requests: Mutex<Vec<i64>>,
    }

    impl FakeExchange {
        fn new(timestamps: impl IntoIterator<Item = i64>) -> Self {
            Self {
                candles: timestamps
                    .into_iter()
                    .map(|ts| Candle::new(ts, 1.0, 2.0, 0.5, 1.5, 3.0))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<i64> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl OhlcSource for FakeExchange {
        async fn fetch_page(&self, _pair: &str, start: i64, _step: i64, limit: u32) -> Result<Vec<Candle>> {
            self.requests.lock().unwrap().push(start);
            Ok(self
                .candles
                .iter()
                .filter(|c| c.timestamp >= start)
                .take(limit as usize)
                .copied()
                .collect())
        }
    }

    struct FailingExchange;

    impl OhlcSource for FailingExchange {
        async fn fetch_page(&self, _: &str, _: i64, _: i64, _: u32) -> Result<Vec<Candle>> {
            anyhow::bail!("503 Service Unavailable")
        }
    }

    /// Returns the same stale page forever.
    struct StuckExchange;

    impl OhlcSource for StuckExchange {
        async fn fetch_page(&self, _: &str, _: i64, _: i64, _: u32) -> Result<Vec<Candle>> {
            Ok(vec![Candle::new(100, 1.0, 1.0, 1.0, 1.0, 1.0)])
        }
    }

    /// First page is at the cursor, every later page jumps back before it.
    #[derive(Default)]
    struct RewindingExchange {
        calls: Mutex<u32>,
    }

    impl OhlcSource for RewindingExchange {
        async fn fetch_page(&self, _: &str, start: i64, _: i64, _: u32) -> Result<Vec<Candle>> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            let ts = if *calls == 1 { start } else { start - 120 };
            Ok(vec![Candle::new(ts, 1.0, 1.0, 1.0, 1.0, 1.0)])
        }
    }

    /// Prepends an out-of-range candle to every non-empty page of the inner
    /// exchange.
    struct MixedExchange(FakeExchange);

    impl OhlcSource for MixedExchange {
        async fn fetch_page(&self, pair: &str, start: i64, step: i64, limit: u32) -> Result<Vec<Candle>> {
            let mut page = self.0.fetch_page(pair, start, step, limit).await?;
            if !page.is_empty() {
                page.insert(0, Candle::new(start - 600, 9.0, 9.0, 9.0, 9.0, 9.0));
            }
            Ok(page)
        }
    }

    fn fetcher(limit: u32) -> CandleFetcher {
        CandleFetcher::new(60, limit, Duration::ZERO)
    }

    #[tokio::test]
    async fn paginates_until_end() {
        let exchange = FakeExchange::new((0..10).map(|i| 1_700_000_000 + i * 60));
        let table = fetcher(3)
            .fetch_range(&exchange, "ethusd", 1_700_000_000, 1_700_000_600)
            .await
            .unwrap();

        assert_eq!(table.len(), 10);
        assert!(table.timestamps().windows(2).all(|w| w[1] - w[0] == 60));
        assert_eq!(
            exchange.requests(),
            vec![1_700_000_000, 1_700_000_180, 1_700_000_360, 1_700_000_540]
        );
    }

    #[tokio::test]
    async fn stops_at_first_empty_page() {
        let exchange = FakeExchange::new([1_700_000_060, 1_700_000_120]);
        let table = fetcher(1000)
            .fetch_range(&exchange, "ethusd", 1_700_000_060, 1_800_000_000)
            .await
            .unwrap();

        assert_eq!(table.timestamps(), vec![1_700_000_060, 1_700_000_120]);
        // Second request at the advanced cursor came back empty.
        assert_eq!(exchange.requests(), vec![1_700_000_060, 1_700_000_180]);
    }

    #[tokio::test]
    async fn empty_first_page_yields_empty_table() {
        let exchange = FakeExchange::new(Vec::<i64>::new());
        let table = fetcher(1000)
            .fetch_range(&exchange, "ethusd", 1_700_000_060, 1_800_000_000)
            .await
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(exchange.requests().len(), 1);
    }

    #[tokio::test]
    async fn start_at_or_after_end_makes_no_request() {
        let exchange = FakeExchange::new([1_700_000_000]);
        let table = fetcher(1000)
            .fetch_range(&exchange, "ethusd", 1_700_000_000, 1_700_000_000)
            .await
            .unwrap();
        assert!(table.is_empty());
        assert!(exchange.requests().is_empty());
    }

    #[tokio::test]
    async fn gaps_are_preserved() {
        let exchange = FakeExchange::new([0, 60, 300, 360]);
        let table = fetcher(2).fetch_range(&exchange, "ethusd", 0, 1_000).await.unwrap();

        let ts = table.timestamps();
        assert_eq!(ts, vec![0, 60, 300, 360]);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn source_error_propagates() {
        let err = fetcher(1000)
            .fetch_range(&FailingExchange, "ethusd", 0, 1_000)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn stale_page_does_not_spin() {
        let table = fetcher(1000)
            .fetch_range(&StuckExchange, "ethusd", 500, 10_000)
            .await
            .unwrap();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn rewinding_source_keeps_timestamps_increasing() {
        let exchange = RewindingExchange::default();
        let table = fetcher(1000)
            .fetch_range(&exchange, "ethusd", 1_000, 10_000)
            .await
            .unwrap();

        let ts = table.timestamps();
        assert_eq!(ts, vec![1_000]);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*exchange.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn rows_before_cursor_are_dropped_from_a_page() {
        let exchange = FakeExchange::new([1_000, 1_060]);
        let table = fetcher(1000)
            .fetch_range(&MixedExchange(exchange), "ethusd", 1_000, 10_000)
            .await
            .unwrap();

        assert_eq!(table.timestamps(), vec![1_000, 1_060]);
    }
}
