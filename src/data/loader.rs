//! CSV candle loader.
//!
//! Expects a header row with `timestamp,open,high,low,close`. Extra columns
//! (volume, spread, ...) are ignored. Timestamps may be RFC3339,
//! `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S` or a bare `%Y-%m-%d`.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use super::types::Candle;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid data at row {row}: {message}")]
    InvalidData { row: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
}

/// Loads candle series from CSV files.
pub struct DataLoader;

impl DataLoader {
    /// Load candles from a CSV file, in file order.
    ///
    /// Rows are not sorted or deduplicated here; ordering problems are
    /// reported by [`crate::validation::validate_series`].
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Candle>, LoaderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?;
        Self::read_candles(&mut reader)
    }

    /// Load candles from any CSV reader.
    pub fn from_reader<R: std::io::Read>(rdr: R) -> Result<Vec<Candle>, LoaderError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(rdr);
        Self::read_candles(&mut reader)
    }

    fn read_candles<R: std::io::Read>(
        reader: &mut csv::Reader<R>,
    ) -> Result<Vec<Candle>, LoaderError> {
        let mut candles = Vec::new();

        for (idx, record) in reader.deserialize::<RawCandle>().enumerate() {
            // Header is line 1
            let row = idx + 2;
            let raw = record?;

            let timestamp = parse_timestamp(&raw.timestamp).ok_or_else(|| {
                LoaderError::InvalidData {
                    row,
                    message: format!("unparseable timestamp '{}'", raw.timestamp),
                }
            })?;

            candles.push(Candle {
                timestamp,
                open: parse_price(&raw.open, "open", row)?,
                high: parse_price(&raw.high, "high", row)?,
                low: parse_price(&raw.low, "low", row)?,
                close: parse_price(&raw.close, "close", row)?,
            });
        }

        Ok(candles)
    }
}

fn parse_price(value: &str, column: &str, row: usize) -> Result<Decimal, LoaderError> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| LoaderError::InvalidData {
            row,
            message: format!("bad {} value '{}': {}", column, value, e),
        })
}

/// Parse the timestamp formats commonly produced by broker exports.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y.%m.%d %H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_from_reader() {
        let data = "timestamp,open,high,low,close,volume\n\
                    2024-10-01 00:00:00,1.10500,1.10550,1.10480,1.10520,120\n\
                    2024-10-01 00:15:00,1.10520,1.10600,1.10510,1.10590,98\n";
        let candles = DataLoader::from_reader(data.as_bytes()).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, dec!(1.10500));
        assert_eq!(candles[1].close, dec!(1.10590));
        assert_eq!(
            candles[1].timestamp,
            NaiveDateTime::parse_from_str("2024-10-01 00:15:00", "%Y-%m-%d %H:%M:%S").unwrap()
        );
    }

    #[test]
    fn test_bad_price_reports_row() {
        let data = "timestamp,open,high,low,close\n\
                    2024-10-01,1.0,1.1,0.9,1.0\n\
                    2024-10-02,abc,1.1,0.9,1.0\n";
        let err = DataLoader::from_reader(data.as_bytes()).unwrap_err();
        match err {
            LoaderError::InvalidData { row, .. } => assert_eq!(row, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_csv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,open,high,low,close").unwrap();
        writeln!(file, "2024-10-01T00:00:00Z,100.00,100.50,99.80,100.20").unwrap();
        file.flush().unwrap();

        let candles = DataLoader::load_csv(file.path()).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].high, dec!(100.50));
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::load_csv("/nonexistent/candles.csv").unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound(_)));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-10-01").is_some());
        assert!(parse_timestamp("2024-10-01 13:45:00").is_some());
        assert!(parse_timestamp("2024.10.01 13:45").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
