pub mod backtest;
pub mod config;
pub mod data;
pub mod metrics;
pub mod risk;
pub mod signals;
pub mod validation;
pub mod walkforward;

// Re-export commonly used types
pub use backtest::{
    run_backtest, trade_cost, BacktestConfig, BacktestEngine, BacktestResult, CostModel,
    EquitySample, ExitReason, Position, Trade,
};
pub use config::{AppConfig, ConfigError};
pub use data::{Candle, DataLoader, LoaderError, Side, Signal};
pub use metrics::{EquityPoint, MetricsCalculator, PerformanceMetrics, PROFIT_FACTOR_SENTINEL};
pub use risk::{dynamic_lot_size, Instrument, PositionSizer, SizingConfig};
pub use signals::{EmaCrossover, SignalSource};
pub use validation::{validate_series, IntegrityReport, ValidationError};
pub use walkforward::{
    walk_forward_validate, ParamValue, ParameterGrid, ParameterSet, Verdict, WalkForwardConfig,
    WalkForwardOutcome, WalkForwardSummary, WalkForwardValidator, WalkForwardWindow,
};
