//! Core backtesting engine.
//!
//! Runs the single-pass simulation loop. Per candle, in order:
//! 1. Ratchet the trailing stop of the open position
//! 2. Check stop-loss, then take-profit, then (optionally) signal reversal
//! 3. Enter a new position on a non-flat signal while flat
//! 4. Record the equity sample
//!
//! Equity is not marked to market: it changes only when the entry cost is
//! deducted and when a trade closes.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Candle, Signal};
use crate::metrics::{EquityPoint, MetricsCalculator, PerformanceMetrics};
use crate::risk::{Instrument, PositionSizer, SizingConfig};
use crate::validation::{validate_series, ValidationError};
use crate::walkforward::ParameterSet;

use super::cost::CostModel;
use super::trade::{ExitReason, Position, Trade};

/// Configuration for backtest execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Starting equity.
    pub initial_capital: Decimal,

    /// Stop-loss distance in points.
    pub stop_loss_points: Decimal,

    /// Take-profit distance in points.
    pub take_profit_points: Decimal,

    /// Profit in points before the trailing stop engages. `<= 0` disables it.
    pub trail_activation_points: Decimal,

    /// Trailing distance behind price, in points.
    pub trail_distance_points: Decimal,

    /// Allow a new entry on the same candle that closed a position.
    pub allow_same_bar_reentry: bool,

    /// Close an open position at the candle close when the signal flips.
    pub exit_on_opposite_signal: bool,

    /// Spread/slippage/commission assumptions.
    pub costs: CostModel,

    /// Point/lot convention.
    pub instrument: Instrument,

    /// Risk-based sizing.
    pub sizing: SizingConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            stop_loss_points: dec!(50),
            take_profit_points: dec!(100),
            trail_activation_points: dec!(50),
            trail_distance_points: dec!(25),
            allow_same_bar_reentry: true,
            exit_on_opposite_signal: false,
            costs: CostModel::default(),
            instrument: Instrument::default(),
            sizing: SizingConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Sizing config whose equity fallback is the initial capital.
    pub fn effective_sizing(&self) -> SizingConfig {
        SizingConfig {
            default_equity: self.initial_capital,
            default_stop_loss_points: if self.stop_loss_points > Decimal::ZERO {
                self.stop_loss_points
            } else {
                self.sizing.default_stop_loss_points
            },
            ..self.sizing.clone()
        }
    }
}

/// Raw equity sample, one per candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    pub timestamp: NaiveDateTime,
    pub equity: Decimal,
}

/// Result of a completed backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Parameters the signals were generated with.
    pub params: ParameterSet,

    pub initial_capital: Decimal,
    pub final_equity: Decimal,
    pub net_profit: Decimal,

    /// Closed trades in exit order.
    pub trades: Vec<Trade>,

    /// One point per candle.
    pub equity_curve: Vec<EquityPoint>,

    pub metrics: PerformanceMetrics,
}

impl BacktestResult {
    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }

    pub fn win_rate(&self) -> f64 {
        self.metrics.win_rate
    }

    pub fn profit_factor(&self) -> f64 {
        self.metrics.profit_factor
    }

    pub fn max_drawdown(&self) -> f64 {
        self.metrics.max_drawdown
    }

    /// Generate a summary report.
    pub fn summary(&self) -> String {
        format!(
            "Backtest Results\n\
             ================\n\
             Parameters: {}\n\
             Candles: {}\n\
             \n\
             Initial Capital: ${:.2}\n\
             Final Equity: ${:.2}\n\
             Net Profit: ${:.2}\n\
             \n\
             {}",
            self.params.key(),
            self.equity_curve.len(),
            self.initial_capital,
            self.final_equity,
            self.net_profit,
            self.metrics.summary(),
        )
    }
}

/// Single-pass trade simulator.
///
/// Owns equity, the open position and the ledger for one run; all three are
/// reset at the start of every run.
pub struct BacktestEngine {
    config: BacktestConfig,
    instrument: Instrument,
    sizer: PositionSizer,

    equity: Decimal,
    position: Option<Position>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquitySample>,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        let instrument = config.instrument.sanitized();
        let sizer = PositionSizer::new(config.effective_sizing(), instrument.clone());
        let equity = config.initial_capital;
        Self {
            config,
            instrument,
            sizer,
            equity,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Validate the inputs and run one pass.
    pub fn run(
        &mut self,
        candles: &[Candle],
        signals: &[Signal],
        params: &ParameterSet,
    ) -> Result<BacktestResult, ValidationError> {
        validate_series(candles, signals)?;
        self.reset();

        let last = candles.len() - 1;
        for (i, (candle, signal)) in candles.iter().zip(signals).enumerate() {
            self.process_candle(candle, *signal, i == last);
        }

        if let Some(candle) = candles.last() {
            self.close_remaining_position(candle);
        }

        let result = self.build_result(params);
        debug!(
            candles = candles.len(),
            trades = result.trades.len(),
            final_equity = %result.final_equity,
            params = %params.key(),
            "Backtest complete"
        );
        Ok(result)
    }

    fn reset(&mut self) {
        self.equity = self.config.initial_capital;
        self.position = None;
        self.trades.clear();
        self.equity_curve.clear();
    }

    fn process_candle(&mut self, candle: &Candle, signal: Signal, is_last: bool) {
        let exited = self.check_exit(candle, signal);

        if self.position.is_none()
            && !signal.is_flat()
            && !is_last
            && (self.config.allow_same_bar_reentry || !exited)
        {
            self.enter(candle, signal);
        }

        self.equity_curve.push(EquitySample {
            timestamp: candle.timestamp,
            equity: self.equity,
        });
    }

    /// Trailing update and exit check. Returns true when a position closed.
    fn check_exit(&mut self, candle: &Candle, signal: Signal) -> bool {
        let Some(position) = self.position.as_mut() else {
            return false;
        };

        position.update_trailing_stop(
            candle.close,
            self.config.trail_activation_points,
            self.config.trail_distance_points,
            &self.instrument,
        );

        let exit = position.check_exit(candle).or_else(|| {
            let reversed = signal.side() == Some(position.side.opposite());
            (self.config.exit_on_opposite_signal && reversed)
                .then_some((ExitReason::SignalReversal, candle.close))
        });

        match exit {
            Some((reason, price)) => {
                self.close_position(candle.timestamp, price, reason);
                true
            }
            None => false,
        }
    }

    fn enter(&mut self, candle: &Candle, signal: Signal) {
        let Some(side) = signal.side() else {
            return;
        };

        let lot = self.sizer.lot_size(self.equity, self.config.stop_loss_points);
        let cost = self.config.costs.calculate(lot, &self.instrument).total;
        self.equity -= cost;

        let position = Position::open(
            side,
            candle.close,
            candle.timestamp,
            lot,
            self.config.stop_loss_points,
            self.config.take_profit_points,
            cost,
            &self.instrument,
        );

        debug!(
            side = ?side,
            price = %position.entry_price,
            lot = %lot,
            cost = %cost,
            "Opened position"
        );

        self.position = Some(position);
    }

    fn close_position(&mut self, time: NaiveDateTime, price: Decimal, reason: ExitReason) {
        if let Some(position) = self.position.take() {
            let trade = position.close(time, price, reason, &self.instrument);
            self.equity += trade.realized_pnl;

            debug!(
                reason = %reason,
                price = %price,
                pnl = %trade.realized_pnl,
                equity = %self.equity,
                "Closed position"
            );

            self.trades.push(trade);
        }
    }

    /// Force-close at the last close.
    fn close_remaining_position(&mut self, last: &Candle) {
        if self.position.is_some() {
            self.close_position(last.timestamp, last.close, ExitReason::EndOfData);
        }
    }

    fn build_result(&self, params: &ParameterSet) -> BacktestResult {
        let equity_curve = MetricsCalculator::annotate_curve(&self.equity_curve);
        let metrics = MetricsCalculator::calculate(
            &self.trades,
            &equity_curve,
            self.config.initial_capital,
            self.equity,
            &self.config.costs,
            &self.instrument,
        );

        BacktestResult {
            params: params.clone(),
            initial_capital: self.config.initial_capital,
            final_equity: self.equity,
            net_profit: self.equity - self.config.initial_capital,
            trades: self.trades.clone(),
            equity_curve,
            metrics,
        }
    }

    /// Open position, if any.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Get current equity.
    pub fn current_equity(&self) -> Decimal {
        self.equity
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }
}

/// Run one backtest over a validated candle/signal series.
pub fn run_backtest(
    candles: &[Candle],
    signals: &[Signal],
    params: &ParameterSet,
    config: &BacktestConfig,
) -> Result<BacktestResult, ValidationError> {
    BacktestEngine::new(config.clone()).run(candles, signals, params)
}
