//! Performance metrics calculator.
//!
//! Derives win rate, profit factor, drawdown and cost totals from a completed
//! trade ledger and equity curve. Every ratio has an explicit substitution
//! rule so the output is always finite.

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::backtest::{CostModel, EquitySample, ExitReason, Trade};
use crate::risk::Instrument;

/// Profit factor reported when there are winners but no losses.
pub const PROFIT_FACTOR_SENTINEL: f64 = 999.0;

/// Equity sample annotated with running peak and drawdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: Decimal,
    /// Running maximum of equity up to and including this sample.
    pub peak: Decimal,
    /// (equity - peak) / peak, always <= 0.
    pub drawdown: f64,
}

/// Summary performance metrics for one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    // Basic statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    // P&L metrics
    pub net_profit: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub profit_factor: f64,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub total_return_pct: f64,

    // Risk metrics
    pub max_drawdown: f64,

    // Costs
    pub avg_lot: Decimal,
    pub total_costs: Decimal,

    // Exit breakdown
    pub stop_loss_exits: usize,
    pub take_profit_exits: usize,
    pub signal_reversal_exits: usize,
    pub end_of_data_exits: usize,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            net_profit: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            profit_factor: 0.0,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            largest_win: Decimal::ZERO,
            largest_loss: Decimal::ZERO,
            total_return_pct: 0.0,
            max_drawdown: 0.0,
            avg_lot: Decimal::ZERO,
            total_costs: Decimal::ZERO,
            stop_loss_exits: 0,
            take_profit_exits: 0,
            signal_reversal_exits: 0,
            end_of_data_exits: 0,
        }
    }
}

impl PerformanceMetrics {
    /// Generate a summary report.
    pub fn summary(&self) -> String {
        format!(
            "Performance Summary\n\
             ====================\n\
             \n\
             Trades: {} (W: {}, L: {})\n\
             Win Rate: {:.1}%\n\
             Profit Factor: {:.2}\n\
             \n\
             Net Profit: ${:.2}\n\
             Total Return: {:.2}%\n\
             Avg Win: ${:.2}\n\
             Avg Loss: ${:.2}\n\
             Largest Win: ${:.2}\n\
             Largest Loss: ${:.2}\n\
             \n\
             Max Drawdown: {:.2}%\n\
             \n\
             Exits: SL {} / TP {} / Reversal {} / End {}\n\
             Estimated Costs: ${:.2} (avg lot {:.2})",
            self.total_trades,
            self.winning_trades,
            self.losing_trades,
            self.win_rate * 100.0,
            self.profit_factor,
            self.net_profit,
            self.total_return_pct,
            self.avg_win,
            self.avg_loss,
            self.largest_win,
            self.largest_loss,
            self.max_drawdown * 100.0,
            self.stop_loss_exits,
            self.take_profit_exits,
            self.signal_reversal_exits,
            self.end_of_data_exits,
            self.total_costs,
            self.avg_lot,
        )
    }
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate metrics from a completed run.
    ///
    /// `total_costs` is an estimate: trade count x cost of the average lot.
    pub fn calculate(
        trades: &[Trade],
        equity_curve: &[EquityPoint],
        initial_capital: Decimal,
        final_equity: Decimal,
        costs: &CostModel,
        instrument: &Instrument,
    ) -> PerformanceMetrics {
        let mut metrics = PerformanceMetrics {
            net_profit: final_equity - initial_capital,
            max_drawdown: Self::max_drawdown(equity_curve),
            ..Default::default()
        };

        if initial_capital > Decimal::ZERO {
            metrics.total_return_pct = to_f64(metrics.net_profit / initial_capital) * 100.0;
        }

        if trades.is_empty() {
            return metrics;
        }

        let winners: Vec<Decimal> = trades
            .iter()
            .filter(|t| t.is_winner())
            .map(|t| t.realized_pnl)
            .collect();
        let losers: Vec<Decimal> = trades
            .iter()
            .filter(|t| !t.is_winner())
            .map(|t| t.realized_pnl)
            .collect();

        metrics.total_trades = trades.len();
        metrics.winning_trades = winners.len();
        metrics.losing_trades = losers.len();
        metrics.win_rate = winners.len() as f64 / trades.len() as f64;

        metrics.gross_profit = winners.iter().copied().sum();
        metrics.gross_loss = losers.iter().copied().sum::<Decimal>().abs();
        metrics.profit_factor =
            Self::calculate_profit_factor(metrics.gross_profit, metrics.gross_loss);

        metrics.avg_win = mean(&winners);
        metrics.avg_loss = mean(&losers);
        metrics.largest_win = winners.iter().copied().max().unwrap_or(Decimal::ZERO);
        metrics.largest_loss = losers.iter().copied().min().unwrap_or(Decimal::ZERO);

        let total_lots: Decimal = trades.iter().map(|t| t.lot_size).sum();
        metrics.avg_lot = total_lots / Decimal::from(trades.len());
        metrics.total_costs =
            Decimal::from(trades.len()) * costs.calculate(metrics.avg_lot, instrument).total;

        for trade in trades {
            match trade.exit_reason {
                ExitReason::StopLoss => metrics.stop_loss_exits += 1,
                ExitReason::TakeProfit => metrics.take_profit_exits += 1,
                ExitReason::SignalReversal => metrics.signal_reversal_exits += 1,
                ExitReason::EndOfData => metrics.end_of_data_exits += 1,
            }
        }

        metrics
    }

    /// Gross profit over gross loss, with the sentinel for loss-free runs.
    pub fn calculate_profit_factor(gross_profit: Decimal, gross_loss: Decimal) -> f64 {
        if gross_loss > Decimal::ZERO {
            to_f64(gross_profit / gross_loss)
        } else if gross_profit > Decimal::ZERO {
            PROFIT_FACTOR_SENTINEL
        } else {
            0.0
        }
    }

    /// Annotate raw samples with running peak and drawdown.
    pub fn annotate_curve(samples: &[EquitySample]) -> Vec<EquityPoint> {
        let mut peak: Option<Decimal> = None;

        samples
            .iter()
            .map(|sample| {
                let current_peak = match peak {
                    Some(p) if p >= sample.equity => p,
                    _ => sample.equity,
                };
                peak = Some(current_peak);

                let drawdown = if current_peak > Decimal::ZERO {
                    (sample.equity - current_peak)
                        .checked_div(current_peak)
                        .map(to_f64)
                        .unwrap_or(0.0)
                } else {
                    0.0
                };

                EquityPoint {
                    timestamp: sample.timestamp,
                    equity: sample.equity,
                    peak: current_peak,
                    drawdown,
                }
            })
            .collect()
    }

    /// Deepest drawdown on the curve (0 for an empty or rising curve).
    pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
        curve.iter().map(|p| p.drawdown).fold(0.0, f64::min)
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len())
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().filter(|v| v.is_finite()).unwrap_or(0.0)
}
