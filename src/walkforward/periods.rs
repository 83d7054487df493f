//! Walk-forward window partitioning.
//!
//! Splits a candle series into successive train/test index ranges by
//! calendar months. Windows whose partitions are too small are skipped by
//! advancing the cursor a fixed stride and retrying.

use std::ops::Range;

use chrono::{Months, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::data::Candle;

/// Configuration for walk-forward validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Training window length in months.
    pub train_months: u32,
    /// Test window length in months.
    pub test_months: u32,
    /// Minimum candles in a training partition.
    pub min_train_candles: usize,
    /// Minimum candles in a test partition.
    pub min_test_candles: usize,
    /// Cursor advance, in candles, when a window is rejected.
    pub retry_stride: usize,
    /// Cap on parameter combinations evaluated per window.
    pub max_combinations: usize,
    /// Minimum in-sample trades for a combination to be eligible.
    pub min_trades: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_months: 3,
            test_months: 1,
            min_train_candles: 500,
            min_test_candles: 100,
            retry_stride: 50,
            max_combinations: 12,
            min_trades: 10,
        }
    }
}

impl WalkForwardConfig {
    /// Smallest series that could hold a single window.
    pub fn min_candles(&self) -> usize {
        self.min_train_candles.max(1) + self.min_test_candles.max(1)
    }
}

/// Index ranges of one train/test split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSplit {
    pub train: Range<usize>,
    pub test: Range<usize>,
    pub train_start: NaiveDateTime,
    pub train_end: NaiveDateTime,
    pub test_start: NaiveDateTime,
    pub test_end: NaiveDateTime,
}

impl WindowSplit {
    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    pub fn test_len(&self) -> usize {
        self.test.len()
    }
}

/// Generator for walk-forward splits over one candle series.
pub struct WalkForwardPeriods<'a> {
    config: &'a WalkForwardConfig,
    candles: &'a [Candle],
}

impl<'a> WalkForwardPeriods<'a> {
    pub fn new(config: &'a WalkForwardConfig, candles: &'a [Candle]) -> Self {
        Self { config, candles }
    }

    /// Generate all splits.
    ///
    /// The train partition spans `train_months` from the cursor; the test
    /// partition spans `test_months` after it, or runs to the end of the
    /// series when less than that remains.
    pub fn generate(&self) -> Vec<WindowSplit> {
        let candles = self.candles;
        let len = candles.len();
        let stride = self.config.retry_stride.max(1);
        let min_train = self.config.min_train_candles.max(1);
        let min_test = self.config.min_test_candles.max(1);

        let mut splits = Vec::new();
        let mut cursor = 0;

        while cursor < len {
            let Some(train_end) = add_months(candles[cursor].timestamp, self.config.train_months)
                .and_then(|boundary| first_index_at_or_after(candles, cursor, boundary))
            else {
                break;
            };

            let test_end = add_months(candles[train_end].timestamp, self.config.test_months)
                .and_then(|boundary| first_index_at_or_after(candles, train_end, boundary))
                .unwrap_or(len);

            if train_end - cursor < min_train || test_end - train_end < min_test {
                cursor += stride;
                continue;
            }

            splits.push(WindowSplit {
                train: cursor..train_end,
                test: train_end..test_end,
                train_start: candles[cursor].timestamp,
                train_end: candles[train_end - 1].timestamp,
                test_start: candles[train_end].timestamp,
                test_end: candles[test_end - 1].timestamp,
            });

            if test_end >= len {
                break;
            }
            cursor = if test_end > cursor {
                test_end
            } else {
                cursor + stride
            };
        }

        splits
    }
}

/// Add calendar months, clamping the day to the target month's length.
pub fn add_months(timestamp: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    timestamp.checked_add_months(Months::new(months))
}

/// First index at or after `from` whose timestamp is `>= boundary`.
fn first_index_at_or_after(candles: &[Candle], from: usize, boundary: NaiveDateTime) -> Option<usize> {
    let offset = candles[from..].partition_point(|c| c.timestamp < boundary);
    let index = from + offset;
    (index < candles.len()).then_some(index)
}
