use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle.  `timestamp` is the interval open in unix seconds.
///
/// Field order matches the CSV column order of the published dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Parse one entry of an exchange `ohlc` array.
    ///
    /// Expected shape (Bitstamp sends every value as a JSON string):
    /// ```json
    /// { "timestamp": "1700000000", "open": "2000.1", "high": "2001.0",
    ///   "low": "1999.5", "close": "2000.7", "volume": "12.3" }
    /// ```
    pub fn from_json(entry: &serde_json::Value) -> Result<Self> {
        Ok(Self {
            timestamp: parse_json_timestamp(&entry["timestamp"], "timestamp")?,
            open: parse_json_f64(&entry["open"], "open")?,
            high: parse_json_f64(&entry["high"], "high")?,
            low: parse_json_f64(&entry["low"], "low")?,
            close: parse_json_f64(&entry["close"], "close")?,
            volume: parse_json_f64(&entry["volume"], "volume")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

/// Coerce a textual cell to a unix timestamp.  Integer literals parse
/// directly; float literals (`"1700000000.0"`) are truncated toward zero.
pub fn coerce_timestamp(raw: &str) -> Result<i64> {
    let s = raw.trim();
    if let Ok(ts) = s.parse::<i64>() {
        return Ok(ts);
    }
    let f = s
        .parse::<f64>()
        .with_context(|| format!("failed to parse '{s}' as a timestamp"))?;
    if !f.is_finite() {
        anyhow::bail!("timestamp '{s}' is not finite");
    }
    Ok(f.trunc() as i64)
}

/// Coerce a textual cell to `f64`.
pub fn coerce_f64(raw: &str) -> Result<f64> {
    let s = raw.trim();
    s.parse::<f64>()
        .with_context(|| format!("failed to parse '{s}' as f64"))
}

/// Helper: exchanges send numeric values either as JSON strings or numbers.
fn parse_json_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::String(s) => {
            coerce_f64(s).with_context(|| format!("field {name}"))
        }
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        serde_json::Value::Null => anyhow::bail!("missing field {name}"),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

fn parse_json_timestamp(val: &serde_json::Value, name: &str) -> Result<i64> {
    match val {
        serde_json::Value::String(s) => {
            coerce_timestamp(s).with_context(|| format!("field {name}"))
        }
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(ts) => Ok(ts),
            None => n
                .as_f64()
                .map(|f| f.trunc() as i64)
                .with_context(|| format!("field {name} is not a valid timestamp")),
        },
        serde_json::Value::Null => anyhow::bail!("missing field {name}"),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_string_encoded_entry() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{
                "timestamp": "1700000060",
                "open": "2000.10",
                "high": "2001.00",
                "low": "1999.50",
                "close": "2000.70",
                "volume": "12.34567890"
            }"#,
        )
        .unwrap();

        let candle = Candle::from_json(&json).expect("should parse");
        assert_eq!(candle.timestamp, 1_700_000_060);
        assert!((candle.open - 2000.10).abs() < 1e-9);
        assert!((candle.volume - 12.3456789).abs() < 1e-9);
    }

    #[test]
    fn parse_number_encoded_entry() {
        let json = serde_json::json!({
            "timestamp": 1700000000,
            "open": 100, "high": 101, "low": 99, "close": 100.5, "volume": 10
        });
        let candle = Candle::from_json(&json).unwrap();
        assert_eq!(candle, Candle::new(1_700_000_000, 100.0, 101.0, 99.0, 100.5, 10.0));
    }

    #[test]
    fn missing_field_is_an_error() {
        let json = serde_json::json!({ "timestamp": "1700000000", "open": "1" });
        let err = Candle::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("high"));
    }

    #[test]
    fn timestamp_coercion_accepts_float_literals() {
        assert_eq!(coerce_timestamp("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(coerce_timestamp(" 1700000000.0 ").unwrap(), 1_700_000_000);
        assert_eq!(coerce_timestamp("1.7e9").unwrap(), 1_700_000_000);
        assert!(coerce_timestamp("yesterday").is_err());
        assert!(coerce_timestamp("NaN").is_err());
    }
}
