pub mod candle;
pub mod table;

// Re-export for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::Candle;
pub use table::CandleTable;
