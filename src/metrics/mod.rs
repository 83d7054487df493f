//! Performance metrics.

pub mod calculator;

pub use calculator::{EquityPoint, MetricsCalculator, PerformanceMetrics, PROFIT_FACTOR_SENTINEL};
