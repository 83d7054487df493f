//! Transaction cost model.
//!
//! cost = (spread_points + slippage_points) x point_value(lot) + commission_per_lot x lot
//!
//! The whole round-trip cost is charged once, at entry.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::risk::Instrument;

/// Cost breakdown for a single trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeCost {
    pub lot: Decimal,
    pub spread: Decimal,
    pub slippage: Decimal,
    pub commission: Decimal,
    pub total: Decimal,
}

/// Configurable spread/slippage/commission assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Average spread in points.
    pub spread_points: Decimal,
    /// Average slippage in points.
    pub slippage_points: Decimal,
    /// Commission in currency per lot.
    pub commission_per_lot: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            spread_points: dec!(10),
            slippage_points: dec!(5),
            commission_per_lot: dec!(7.0),
        }
    }
}

impl CostModel {
    pub fn new(spread_points: Decimal, slippage_points: Decimal, commission_per_lot: Decimal) -> Self {
        Self {
            spread_points,
            slippage_points,
            commission_per_lot,
        }
    }

    /// Create a zero-cost model.
    pub fn zero() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    /// Calculate the cost breakdown for a trade of `lot` lots.
    pub fn calculate(&self, lot: Decimal, instrument: &Instrument) -> TradeCost {
        let lot = lot.max(Decimal::ZERO);
        let point_value = instrument.sanitized().point_value_for(lot);

        let spread = self.spread_points.max(Decimal::ZERO) * point_value;
        let slippage = self.slippage_points.max(Decimal::ZERO) * point_value;
        let commission = self.commission_per_lot.max(Decimal::ZERO) * lot;

        TradeCost {
            lot,
            spread,
            slippage,
            commission,
            total: spread + slippage + commission,
        }
    }
}

/// Total round-trip cost for one trade. Negative inputs count as zero.
pub fn trade_cost(
    lot: Decimal,
    spread_points: Decimal,
    slippage_points: Decimal,
    commission_per_lot: Decimal,
    instrument: &Instrument,
) -> Decimal {
    CostModel::new(spread_points, slippage_points, commission_per_lot)
        .calculate(lot, instrument)
        .total
}
