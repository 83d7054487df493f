//! Position sizing module.
//!
//! Converts account risk tolerance and stop distance into a lot size:
//! - Risk amount: equity x risk_pct / 100
//! - Stop cost per reference lot: stop_loss_points x point_value
//! - Lot: risk amount / stop cost x reference lot, rounded to broker granularity
//!
//! The result is always a positive lot within [min_lot, max_lot].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::instrument::Instrument;

/// Position sizing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Percentage of equity risked per trade.
    pub risk_pct: Decimal,
    /// Equity used when the account equity is non-positive.
    pub default_equity: Decimal,
    /// Stop distance used when the requested one is non-positive.
    pub default_stop_loss_points: Decimal,
    /// Lot returned when the stop cost cannot be computed.
    pub base_lot: Decimal,
    /// Smallest tradable lot.
    pub min_lot: Decimal,
    /// Largest lot the sizer will ever return.
    pub max_lot: Decimal,
    /// Broker lot granularity in decimal places.
    pub lot_decimals: u32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_pct: dec!(2.0),
            default_equity: dec!(10000),
            default_stop_loss_points: dec!(50),
            base_lot: dec!(0.1),
            min_lot: dec!(0.01),
            max_lot: dec!(5.0),
            lot_decimals: 2,
        }
    }
}

impl SizingConfig {
    /// Lot bounds with unusable values replaced, so `min > 0` and `max >= min`.
    fn bounds(&self) -> (Decimal, Decimal) {
        let min = if self.min_lot > Decimal::ZERO {
            self.min_lot
        } else {
            dec!(0.01)
        };
        let max = self.max_lot.max(min);
        (min, max)
    }
}

/// Compute a risk-based lot size.
///
/// Guards: non-positive equity falls back to `default_equity`, non-positive
/// stop distance to `default_stop_loss_points`, a zero stop cost returns the
/// base lot. Never returns zero, negative or non-finite output.
pub fn dynamic_lot_size(
    equity: Decimal,
    risk_pct: Decimal,
    stop_loss_points: Decimal,
    instrument: &Instrument,
    config: &SizingConfig,
) -> Decimal {
    let (min_lot, max_lot) = config.bounds();
    let instrument = instrument.sanitized();

    let equity = if equity > Decimal::ZERO {
        equity
    } else {
        config.default_equity
    };
    let stop_loss_points = if stop_loss_points > Decimal::ZERO {
        stop_loss_points
    } else {
        config.default_stop_loss_points
    };
    let risk_pct = risk_pct.max(Decimal::ZERO);

    let risk_amount = equity * risk_pct / dec!(100);
    let stop_cost_per_reference_lot = stop_loss_points * instrument.point_value;

    if stop_cost_per_reference_lot.is_zero() {
        return config.base_lot.clamp(min_lot, max_lot);
    }

    let lot = risk_amount
        .checked_div(stop_cost_per_reference_lot)
        .and_then(|units| units.checked_mul(instrument.reference_lot))
        .unwrap_or(max_lot);

    lot.round_dp(config.lot_decimals).clamp(min_lot, max_lot)
}

/// Position sizer bound to one instrument and sizing configuration.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: SizingConfig,
    instrument: Instrument,
}

impl PositionSizer {
    pub fn new(config: SizingConfig, instrument: Instrument) -> Self {
        Self { config, instrument }
    }

    /// Lot size for the given equity and stop distance at the configured risk.
    pub fn lot_size(&self, equity: Decimal, stop_loss_points: Decimal) -> Decimal {
        dynamic_lot_size(
            equity,
            self.config.risk_pct,
            stop_loss_points,
            &self.instrument,
            &self.config,
        )
    }
}
