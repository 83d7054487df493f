//! Position and trade lifecycle.
//!
//! A [`Position`] exists only while a trade is open. Closing it consumes the
//! position and produces an immutable [`Trade`] for the ledger.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{Candle, Side};
use crate::risk::Instrument;

/// Reason for exiting a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    /// Static or trailing stop pierced.
    StopLoss,
    /// Take-profit level reached.
    TakeProfit,
    /// Closed because the signal flipped to the opposite side.
    SignalReversal,
    /// Force-closed at the end of the series.
    EndOfData,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::SignalReversal => "signal_reversal",
            Self::EndOfData => "end_of_data",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: Decimal,
    pub entry_time: NaiveDateTime,
    pub lot_size: Decimal,
    /// Fixed at entry.
    pub stop_loss_price: Decimal,
    /// Fixed at entry.
    pub take_profit_price: Decimal,
    /// Trailing level once engaged. Only moves favorably.
    pub trailing_stop: Option<Decimal>,
    /// Cost deducted from equity when the position was opened.
    pub entry_cost: Decimal,
}

impl Position {
    /// Open a position at `entry_price` with stop and target placed
    /// `stop_loss_points` / `take_profit_points` away.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        side: Side,
        entry_price: Decimal,
        entry_time: NaiveDateTime,
        lot_size: Decimal,
        stop_loss_points: Decimal,
        take_profit_points: Decimal,
        entry_cost: Decimal,
        instrument: &Instrument,
    ) -> Self {
        let sign = side.sign();
        let stop_distance = instrument.points_to_price(stop_loss_points);
        let target_distance = instrument.points_to_price(take_profit_points);

        Self {
            side,
            entry_price,
            entry_time,
            lot_size,
            stop_loss_price: entry_price - sign * stop_distance,
            take_profit_price: entry_price + sign * target_distance,
            trailing_stop: None,
            entry_cost,
        }
    }

    /// The more favorable of the static stop and the trailing level.
    pub fn effective_stop(&self) -> Decimal {
        match (self.side, self.trailing_stop) {
            (Side::Long, Some(level)) => level.max(self.stop_loss_price),
            (Side::Short, Some(level)) => level.min(self.stop_loss_price),
            (_, None) => self.stop_loss_price,
        }
    }

    /// Unrealized profit in instrument points at `price`.
    pub fn profit_points(&self, price: Decimal, instrument: &Instrument) -> Decimal {
        instrument.price_to_points((price - self.entry_price) * self.side.sign())
    }

    /// Realized P&L if the position were closed at `exit_price`.
    pub fn pnl_at(&self, exit_price: Decimal, instrument: &Instrument) -> Decimal {
        (exit_price - self.entry_price) * self.side.sign() * self.lot_size * instrument.contract_size
    }

    /// Ratchet the trailing stop using `price`.
    ///
    /// Once profit reaches `activation_points`, the trailing level moves to
    /// `price -/+ distance_points` if that is more favorable than the
    /// effective stop. Returns true when it moved. Disabled for
    /// `activation_points <= 0`.
    pub fn update_trailing_stop(
        &mut self,
        price: Decimal,
        activation_points: Decimal,
        distance_points: Decimal,
        instrument: &Instrument,
    ) -> bool {
        if activation_points <= Decimal::ZERO {
            return false;
        }
        if self.profit_points(price, instrument) < activation_points {
            return false;
        }

        let distance = instrument.points_to_price(distance_points.max(Decimal::ZERO));
        let current = self.effective_stop();
        let (level, improves) = match self.side {
            Side::Long => (price - distance, price - distance > current),
            Side::Short => (price + distance, price + distance < current),
        };
        if improves {
            self.trailing_stop = Some(level);
        }
        improves
    }

    /// Check the candle range against stop, target and trailing level.
    ///
    /// Order: static stop, take-profit, then the trailing level. A candle
    /// spanning the static stop and the target resolves as a stop-loss; one
    /// reaching the target closes there even if it also pierced the trail.
    /// A trailing exit is reported as a stop-loss at the trailing level.
    pub fn check_exit(&self, candle: &Candle) -> Option<(ExitReason, Decimal)> {
        let (stop_hit, target_hit, trail_hit) = match self.side {
            Side::Long => (
                candle.low <= self.stop_loss_price,
                candle.high >= self.take_profit_price,
                self.trailing_stop.filter(|level| candle.low <= *level),
            ),
            Side::Short => (
                candle.high >= self.stop_loss_price,
                candle.low <= self.take_profit_price,
                self.trailing_stop.filter(|level| candle.high >= *level),
            ),
        };

        if stop_hit {
            Some((ExitReason::StopLoss, self.stop_loss_price))
        } else if target_hit {
            Some((ExitReason::TakeProfit, self.take_profit_price))
        } else {
            trail_hit.map(|level| (ExitReason::StopLoss, level))
        }
    }

    /// Close the position, producing the ledger entry.
    pub fn close(
        self,
        exit_time: NaiveDateTime,
        exit_price: Decimal,
        exit_reason: ExitReason,
        instrument: &Instrument,
    ) -> Trade {
        let realized_pnl = self.pnl_at(exit_price, instrument);
        Trade {
            side: self.side,
            entry_time: self.entry_time,
            exit_time,
            entry_price: self.entry_price,
            exit_price,
            lot_size: self.lot_size,
            entry_cost: self.entry_cost,
            realized_pnl,
            exit_reason,
        }
    }
}

/// A closed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub lot_size: Decimal,
    /// Informational; already deducted from equity at entry.
    pub entry_cost: Decimal,
    /// Price P&L. Entry cost is not subtracted again.
    pub realized_pnl: Decimal,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }

    /// P&L after the entry cost.
    pub fn net_pnl(&self) -> Decimal {
        self.realized_pnl - self.entry_cost
    }

    /// Holding time in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.exit_time - self.entry_time).num_minutes()
    }
}
