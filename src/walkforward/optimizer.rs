//! Walk-forward parameter optimization.
//!
//! For each train/test split: search a bounded sample of the parameter grid
//! on the train slice, then run the winner out-of-sample on the test slice.
//! Per-window results are folded into a [`WalkForwardSummary`].

use chrono::NaiveDateTime;
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info};

use crate::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::data::Candle;
use crate::signals::SignalSource;
use crate::validation::{validate_candles, ValidationError};

use super::params::{ParameterGrid, ParameterSet};
use super::periods::{WalkForwardConfig, WalkForwardPeriods, WindowSplit};

/// One out-of-sample window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardWindow {
    /// Window number (1-indexed).
    pub window_num: usize,
    pub train_start: NaiveDateTime,
    pub train_end: NaiveDateTime,
    pub test_start: NaiveDateTime,
    pub test_end: NaiveDateTime,
    pub train_candles: usize,
    pub test_candles: usize,
    /// Parameters selected on the train slice.
    pub params: ParameterSet,
    /// Whether `params` is the fallback default.
    pub used_default: bool,
    /// Profit factor of `params` on the train slice.
    pub in_sample_profit_factor: f64,
    /// Out-of-sample result on the test slice.
    pub result: BacktestResult,
}

/// Robustness verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Robust,
    Marginal,
    NotProfitable,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Robust => "robust",
            Self::Marginal => "marginal",
            Self::NotProfitable => "not_profitable",
        }
    }
}

/// Aggregate over all out-of-sample windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    pub total_net_profit: Decimal,
    pub total_trades: usize,
    /// Mean profit factor over windows with a positive profit factor.
    pub avg_profit_factor: f64,
    /// Deepest out-of-sample drawdown.
    pub worst_drawdown: f64,
    /// 1 - stdev(net) / (|mean(net)| + 1). Higher is more consistent.
    pub consistency_score: f64,
    pub window_count: usize,
}

impl WalkForwardSummary {
    pub fn from_windows(windows: &[WalkForwardWindow]) -> Self {
        let total_net_profit = windows.iter().map(|w| w.result.net_profit).sum();
        let total_trades = windows.iter().map(|w| w.result.total_trades()).sum();

        let positive: Vec<f64> = windows
            .iter()
            .map(|w| w.result.profit_factor())
            .filter(|pf| *pf > 0.0)
            .collect();
        let avg_profit_factor = if positive.is_empty() {
            0.0
        } else {
            positive.iter().sum::<f64>() / positive.len() as f64
        };

        let worst_drawdown = windows
            .iter()
            .map(|w| w.result.max_drawdown())
            .fold(0.0, f64::min);

        let nets: Vec<f64> = windows
            .iter()
            .map(|w| w.result.net_profit.to_f64().unwrap_or(0.0))
            .collect();

        Self {
            total_net_profit,
            total_trades,
            avg_profit_factor,
            worst_drawdown,
            consistency_score: consistency_score(&nets),
            window_count: windows.len(),
        }
    }

    pub fn verdict(&self) -> Verdict {
        if self.avg_profit_factor > 1.3 && self.worst_drawdown > -0.25 {
            Verdict::Robust
        } else if self.avg_profit_factor > 1.0 {
            Verdict::Marginal
        } else {
            Verdict::NotProfitable
        }
    }

    /// Get summary string.
    pub fn summary(&self) -> String {
        format!(
            "Walk-Forward Results: {} windows\n\
             Total Net Profit: ${:.2}\n\
             Total Trades: {}\n\
             Avg Profit Factor: {:.2}\n\
             Worst Drawdown: {:.2}%\n\
             Consistency: {:.2}\n\
             Verdict: {}",
            self.window_count,
            self.total_net_profit,
            self.total_trades,
            self.avg_profit_factor,
            self.worst_drawdown * 100.0,
            self.consistency_score,
            self.verdict().as_str(),
        )
    }
}

/// 1 - population stdev / (|mean| + 1); 0 for an empty input.
pub fn consistency_score(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().mean();
    let std = values.iter().population_std_dev();
    let score = 1.0 - std / (mean.abs() + 1.0);
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Terminal outcome of a walk-forward run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WalkForwardOutcome {
    Completed {
        windows: Vec<WalkForwardWindow>,
        summary: WalkForwardSummary,
    },
    InsufficientData {
        candles: usize,
        reason: String,
    },
}

impl WalkForwardOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn summary(&self) -> Option<&WalkForwardSummary> {
        match self {
            Self::Completed { summary, .. } => Some(summary),
            Self::InsufficientData { .. } => None,
        }
    }

    pub fn windows(&self) -> &[WalkForwardWindow] {
        match self {
            Self::Completed { windows, .. } => windows,
            Self::InsufficientData { .. } => &[],
        }
    }
}

/// Best combination found on one train slice.
struct Selection {
    params: ParameterSet,
    profit_factor: f64,
    used_default: bool,
}

/// Walk-forward validator with parallel parameter search.
pub struct WalkForwardValidator {
    config: WalkForwardConfig,
    backtest: BacktestConfig,
    grid: ParameterGrid,
    default_params: ParameterSet,
}

impl Default for WalkForwardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkForwardValidator {
    pub fn new() -> Self {
        Self {
            config: WalkForwardConfig::default(),
            backtest: BacktestConfig::default(),
            grid: ParameterGrid::default(),
            default_params: ParameterSet::default(),
        }
    }

    /// Set walk-forward configuration.
    pub fn with_config(mut self, config: WalkForwardConfig) -> Self {
        self.config = config;
        self
    }

    /// Set base backtest configuration.
    pub fn with_backtest_config(mut self, config: BacktestConfig) -> Self {
        self.backtest = config;
        self
    }

    /// Set parameter grid.
    pub fn with_param_grid(mut self, grid: ParameterGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Set the fallback parameters.
    pub fn with_default_params(mut self, params: ParameterSet) -> Self {
        self.default_params = params;
        self
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Run walk-forward validation.
    ///
    /// Malformed candles are an error; a series too short for a single
    /// window is [`WalkForwardOutcome::InsufficientData`].
    pub fn validate<S: SignalSource>(
        &self,
        candles: &[Candle],
        source: &S,
    ) -> Result<WalkForwardOutcome, ValidationError> {
        validate_candles(candles)?;

        let required = self.config.min_candles();
        if candles.len() < required {
            return Ok(WalkForwardOutcome::InsufficientData {
                candles: candles.len(),
                reason: format!(
                    "{} candles, at least {} required for one window",
                    candles.len(),
                    required
                ),
            });
        }

        let splits = WalkForwardPeriods::new(&self.config, candles).generate();
        if splits.is_empty() {
            return Ok(WalkForwardOutcome::InsufficientData {
                candles: candles.len(),
                reason: format!(
                    "no window with {} train and {} test candles",
                    self.config.min_train_candles, self.config.min_test_candles
                ),
            });
        }

        let combinations = self.grid.sample(self.config.max_combinations);
        info!(
            "Walk-forward: {} windows, {} parameter combinations",
            splits.len(),
            combinations.len()
        );

        let mut windows = Vec::with_capacity(splits.len());
        for (idx, split) in splits.iter().enumerate() {
            let window = self.run_window(idx + 1, candles, split, &combinations, source)?;

            info!(
                "Window {}/{}: test {} to {}, params = {}, IS PF = {:.2}, OOS PF = {:.2}, trades = {}, net = {:.2}",
                idx + 1,
                splits.len(),
                window.test_start,
                window.test_end,
                window.params.key(),
                window.in_sample_profit_factor,
                window.result.profit_factor(),
                window.result.total_trades(),
                window.result.net_profit
            );

            windows.push(window);
        }

        let summary = WalkForwardSummary::from_windows(&windows);
        info!(
            "Walk-forward complete: {} windows, verdict = {}",
            summary.window_count,
            summary.verdict().as_str()
        );

        Ok(WalkForwardOutcome::Completed { windows, summary })
    }

    fn run_window<S: SignalSource>(
        &self,
        window_num: usize,
        candles: &[Candle],
        split: &WindowSplit,
        combinations: &[ParameterSet],
        source: &S,
    ) -> Result<WalkForwardWindow, ValidationError> {
        let train = &candles[split.train.clone()];
        let test = &candles[split.test.clone()];

        let selection = self.select_params(train, combinations, source)?;

        let test_signals = source.generate(test, &selection.params);
        let result = run_backtest(test, &test_signals, &selection.params, &self.backtest)?;

        Ok(WalkForwardWindow {
            window_num,
            train_start: split.train_start,
            train_end: split.train_end,
            test_start: split.test_start,
            test_end: split.test_end,
            train_candles: split.train_len(),
            test_candles: split.test_len(),
            params: selection.params,
            used_default: selection.used_default,
            in_sample_profit_factor: selection.profit_factor,
            result,
        })
    }

    /// Evaluate every combination on the train slice in parallel and keep
    /// the highest profit factor among those with enough trades.
    fn select_params<S: SignalSource>(
        &self,
        train: &[Candle],
        combinations: &[ParameterSet],
        source: &S,
    ) -> Result<Selection, ValidationError> {
        let results: Vec<(f64, usize)> = combinations
            .par_iter()
            .map(|params| {
                let signals = source.generate(train, params);
                run_backtest(train, &signals, params, &self.backtest)
                    .map(|r| (r.profit_factor(), r.total_trades()))
            })
            .collect::<Result<_, _>>()?;

        // Scan in enumeration order; strict `>` keeps the earliest on ties
        let mut best: Option<(usize, f64)> = None;
        for (idx, (pf, trades)) in results.iter().enumerate() {
            if *trades < self.config.min_trades {
                continue;
            }
            if best.map_or(true, |(_, best_pf)| *pf > best_pf) {
                best = Some((idx, *pf));
            }
        }

        match best {
            Some((idx, profit_factor)) => Ok(Selection {
                params: combinations[idx].clone(),
                profit_factor,
                used_default: false,
            }),
            None => {
                debug!(
                    "No combination reached {} trades, using default params",
                    self.config.min_trades
                );
                let signals = source.generate(train, &self.default_params);
                let result = run_backtest(train, &signals, &self.default_params, &self.backtest)?;
                Ok(Selection {
                    params: self.default_params.clone(),
                    profit_factor: result.profit_factor(),
                    used_default: true,
                })
            }
        }
    }
}

/// Run walk-forward validation with default thresholds and backtest config.
pub fn walk_forward_validate<S: SignalSource>(
    candles: &[Candle],
    source: &S,
    grid: &ParameterGrid,
    train_months: u32,
    test_months: u32,
) -> Result<WalkForwardOutcome, ValidationError> {
    WalkForwardValidator::new()
        .with_config(WalkForwardConfig {
            train_months,
            test_months,
            ..Default::default()
        })
        .with_param_grid(grid.clone())
        .validate(candles, source)
}
