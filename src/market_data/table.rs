use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::{debug, info, warn};

use super::candle::{coerce_f64, coerce_timestamp, Candle};

/// Column names of the interchange CSV, in file order.
pub const CSV_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// An ordered, in-memory candle table.  This is the dataset snapshot: read
/// once, extended with freshly fetched rows, written once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleTable {
    candles: Vec<Candle>,
}

impl CandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.candles.iter().map(|c| c.timestamp).collect()
    }

    /// Largest timestamp present, `None` for an empty table.
    pub fn max_timestamp(&self) -> Option<i64> {
        self.candles.iter().map(|c| c.timestamp).max()
    }

    pub fn extend(&mut self, page: impl IntoIterator<Item = Candle>) {
        self.candles.extend(page);
    }

    /// Old rows followed by `other`'s rows, order preserved.
    pub fn concat(mut self, other: CandleTable) -> CandleTable {
        self.candles.extend(other.candles);
        self
    }

    // -------------------------------------------------------------------------
    // CSV
    // -------------------------------------------------------------------------

    /// Parse a CSV file whose header contains the six OHLCV columns.
    ///
    /// Columns are located by name (case-insensitive); extra columns are
    /// ignored with a warning and do not survive a later `write_csv`.  Every required cell is coerced to its column type and any
    /// cell that fails coercion aborts the load with the offending line.
    pub fn read_csv(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "reading candle CSV");

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_path(path)
            .with_context(|| format!("failed to open CSV {}", path.display()))?;

        let headers = rdr
            .headers()
            .with_context(|| format!("failed to read CSV header of {}", path.display()))?
            .clone();
        let columns = ColumnIndex::locate(&headers)
            .with_context(|| format!("unexpected CSV layout in {}", path.display()))?;
        let dropped = ColumnIndex::extra_columns(&headers);
        if !dropped.is_empty() {
            warn!(path = %path.display(), columns = ?dropped, "CSV columns outside the OHLCV set will not be republished");
        }

        let mut candles = Vec::new();
        for result in rdr.records() {
            let record =
                result.with_context(|| format!("malformed CSV record in {}", path.display()))?;
            let line = record.position().map_or(0, |p| p.line());
            let candle = columns
                .parse(&record)
                .with_context(|| format!("bad row on line {line} of {}", path.display()))?;
            candles.push(candle);
        }

        info!(rows = candles.len(), path = %path.display(), "candle CSV loaded");
        Ok(Self { candles })
    }

    /// Write the table with a `timestamp,open,high,low,close,volume` header
    /// and no index column.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("failed to create CSV {}", path.display()))?;

        wtr.write_record(CSV_COLUMNS)
            .context("failed to write CSV header")?;
        for candle in &self.candles {
            wtr.serialize(candle)
                .with_context(|| format!("failed to write candle {}", candle.timestamp))?;
        }
        wtr.flush()
            .with_context(|| format!("failed to flush CSV {}", path.display()))?;

        debug!(rows = self.candles.len(), path = %path.display(), "candle CSV written");
        Ok(())
    }
}

impl From<Vec<Candle>> for CandleTable {
    fn from(candles: Vec<Candle>) -> Self {
        Self { candles }
    }
}

/// Position of each required column within a CSV header.
struct ColumnIndex([usize; 6]);

impl ColumnIndex {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let mut idx = [0usize; 6];
        for (slot, name) in idx.iter_mut().zip(CSV_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .with_context(|| format!("missing required column '{name}'"))?;
        }
        Ok(Self(idx))
    }

    /// Header names that are not one of the OHLCV columns.
    fn extra_columns(headers: &StringRecord) -> Vec<String> {
        headers
            .iter()
            .map(str::trim)
            .filter(|h| !CSV_COLUMNS.iter().any(|c| h.eq_ignore_ascii_case(c)))
            .map(str::to_string)
            .collect()
    }

    fn cell<'r>(&self, record: &'r StringRecord, col: usize) -> Result<&'r str> {
        record
            .get(self.0[col])
            .with_context(|| format!("missing value for column '{}'", CSV_COLUMNS[col]))
    }

    fn parse(&self, record: &StringRecord) -> Result<Candle> {
        let f = |col: usize| -> Result<f64> {
            coerce_f64(self.cell(record, col)?)
                .with_context(|| format!("column '{}'", CSV_COLUMNS[col]))
        };
        let timestamp = coerce_timestamp(self.cell(record, 0)?).context("column 'timestamp'")?;
        Ok(Candle::new(timestamp, f(1)?, f(2)?, f(3)?, f(4)?, f(5)?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
