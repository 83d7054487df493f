//! Boundary validation for candle and signal series.
//!
//! Validates:
//! - Series is non-empty
//! - Timestamps strictly increasing (ordered and unique)
//! - Prices positive, with low <= open/close <= high
//! - Signal series aligned index-for-index with candles
//!
//! The simulator assumes all of the above and never re-checks per candle.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::data::{Candle, Signal};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Candle series is empty")]
    EmptySeries,

    #[error("Timestamps not strictly increasing at index {index}")]
    NonMonotonic { index: usize },

    #[error("Invalid prices at index {index}: {message}")]
    InvalidPrice { index: usize, message: String },

    #[error("Signal count {signals} does not match candle count {candles}")]
    SignalLengthMismatch { candles: usize, signals: usize },
}

/// Reject malformed inputs before any simulation runs.
pub fn validate_series(candles: &[Candle], signals: &[Signal]) -> Result<(), ValidationError> {
    validate_candles(candles)?;
    if signals.len() != candles.len() {
        return Err(ValidationError::SignalLengthMismatch {
            candles: candles.len(),
            signals: signals.len(),
        });
    }
    Ok(())
}

/// Validate a candle series on its own.
pub fn validate_candles(candles: &[Candle]) -> Result<(), ValidationError> {
    if candles.is_empty() {
        return Err(ValidationError::EmptySeries);
    }

    if let Some(index) = first_non_monotonic(candles) {
        return Err(ValidationError::NonMonotonic { index });
    }

    for (index, candle) in candles.iter().enumerate() {
        if let Some(message) = price_problem(candle) {
            return Err(ValidationError::InvalidPrice { index, message });
        }
    }

    Ok(())
}

fn first_non_monotonic(candles: &[Candle]) -> Option<usize> {
    candles
        .windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
        .map(|i| i + 1)
}

fn price_problem(candle: &Candle) -> Option<String> {
    let prices = [candle.open, candle.high, candle.low, candle.close];
    if prices.iter().any(|p| *p <= Decimal::ZERO) {
        return Some("non-positive price".to_string());
    }
    if candle.high < candle.low {
        return Some(format!("high {} below low {}", candle.high, candle.low));
    }
    if candle.open > candle.high || candle.open < candle.low {
        return Some(format!("open {} outside [{}, {}]", candle.open, candle.low, candle.high));
    }
    if candle.close > candle.high || candle.close < candle.low {
        return Some(format!("close {} outside [{}, {}]", candle.close, candle.low, candle.high));
    }
    None
}

/// Result of a single integrity check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Full integrity report over a candle series.
///
/// Unlike [`validate_candles`], every check runs and every offending index is
/// counted.
#[derive(Debug)]
pub struct IntegrityReport {
    pub candle_count: usize,
    pub checks: Vec<CheckResult>,
}

impl IntegrityReport {
    pub fn build(candles: &[Candle]) -> Self {
        let mut checks = Vec::new();

        if candles.is_empty() {
            checks.push(CheckResult::fail("non_empty", "Series has no candles", None));
        } else {
            checks.push(CheckResult::pass(
                "non_empty",
                &format!("{} candles", candles.len()),
            ));
        }

        let unordered: Vec<usize> = candles
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[1].timestamp <= w[0].timestamp)
            .map(|(i, _)| i + 1)
            .collect();
        if unordered.is_empty() {
            checks.push(CheckResult::pass(
                "chronological_order",
                "Timestamps strictly increasing",
            ));
        } else {
            checks.push(CheckResult::fail(
                "chronological_order",
                &format!("{} out-of-order or duplicate timestamps", unordered.len()),
                Some(format!("First at index {}", unordered[0])),
            ));
        }

        let bad_prices: Vec<(usize, String)> = candles
            .iter()
            .enumerate()
            .filter_map(|(i, c)| price_problem(c).map(|m| (i, m)))
            .collect();
        if bad_prices.is_empty() {
            checks.push(CheckResult::pass("price_validity", "All OHLC values consistent"));
        } else {
            let (index, message) = &bad_prices[0];
            checks.push(CheckResult::fail(
                "price_validity",
                &format!("{} candles with invalid prices", bad_prices.len()),
                Some(format!("First at index {}: {}", index, message)),
            ));
        }

        Self {
            candle_count: candles.len(),
            checks,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        format!(
            "{} candles: {}/{} checks passed",
            self.candle_count,
            passed,
            self.checks.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn ts(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(minutes)
    }

    fn candle(minutes: i64) -> Candle {
        Candle::new(ts(minutes), dec!(100), dec!(101), dec!(99), dec!(100.5))
    }

    #[test]
    fn test_valid_series() {
        let candles = vec![candle(0), candle(15), candle(30)];
        let signals = vec![Signal::Flat; 3];
        assert!(validate_series(&candles, &signals).is_ok());
    }

    #[test]
    fn test_empty_series_rejected() {
        assert_eq!(validate_series(&[], &[]), Err(ValidationError::EmptySeries));
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let candles = vec![candle(0), candle(15), candle(15)];
        let signals = vec![Signal::Flat; 3];
        assert_eq!(
            validate_series(&candles, &signals),
            Err(ValidationError::NonMonotonic { index: 2 })
        );
    }

    #[test]
    fn test_backwards_timestamp_rejected() {
        let candles = vec![candle(30), candle(15)];
        assert_eq!(
            validate_candles(&candles),
            Err(ValidationError::NonMonotonic { index: 1 })
        );
    }

    #[test]
    fn test_signal_mismatch_rejected() {
        let candles = vec![candle(0), candle(15)];
        let signals = vec![Signal::Long];
        assert_eq!(
            validate_series(&candles, &signals),
            Err(ValidationError::SignalLengthMismatch {
                candles: 2,
                signals: 1
            })
        );
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let mut bad = candle(0);
        bad.low = dec!(0);
        let err = validate_candles(&[bad]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPrice { index: 0, .. }));
    }

    #[test]
    fn test_close_outside_range_rejected() {
        let mut bad = candle(0);
        bad.close = dec!(102);
        assert!(validate_candles(&[candle(-15), bad]).is_err());
    }

    #[test]
    fn test_integrity_report() {
        let mut bad = candle(30);
        bad.high = dec!(98);
        let candles = vec![candle(0), candle(15), candle(15), bad];

        let report = IntegrityReport::build(&candles);
        assert!(!report.all_passed());
        assert_eq!(report.failed_checks().len(), 2);
        assert!(report.summary().contains("1/3"));
    }
}
