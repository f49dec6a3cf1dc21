pub mod client;
pub mod fetcher;

pub use client::BitstampClient;
pub use fetcher::{CandleFetcher, OhlcSource};
