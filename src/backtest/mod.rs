//! Candle backtesting.
//!
//! This module provides the single-pass trade simulator:
//! - Transaction cost model (spread, slippage, commission)
//! - Position lifecycle (entry, trailing stop, exits)
//! - The per-candle state machine and its result

pub mod cost;
pub mod engine;
pub mod trade;

pub use cost::{trade_cost, CostModel, TradeCost};
pub use engine::{run_backtest, BacktestConfig, BacktestEngine, BacktestResult, EquitySample};
pub use trade::{ExitReason, Position, Trade};
