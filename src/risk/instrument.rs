//! Instrument point/lot convention.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// How an instrument converts points and lots into price and currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instrument {
    /// Symbol, informational only.
    pub symbol: String,
    /// Price move of one point (e.g., 0.01).
    pub point_size: Decimal,
    /// Currency value of one point for `reference_lot` lots.
    pub point_value: Decimal,
    /// Lot size `point_value` is quoted for.
    pub reference_lot: Decimal,
    /// Realized P&L multiplier: price difference x lot x contract_size.
    pub contract_size: Decimal,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            symbol: "XAUUSD".to_string(),
            point_size: dec!(0.01),
            point_value: dec!(0.10),
            reference_lot: dec!(0.1),
            contract_size: dec!(100),
        }
    }
}

impl Instrument {
    /// Replace non-positive fields with the defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let pick = |v: Decimal, d: Decimal| if v > Decimal::ZERO { v } else { d };
        Self {
            symbol: self.symbol.clone(),
            point_size: pick(self.point_size, defaults.point_size),
            point_value: pick(self.point_value, defaults.point_value),
            reference_lot: pick(self.reference_lot, defaults.reference_lot),
            contract_size: pick(self.contract_size, defaults.contract_size),
        }
    }

    /// Currency value of one point at the given lot size.
    pub fn point_value_for(&self, lot: Decimal) -> Decimal {
        if self.reference_lot <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.point_value * lot / self.reference_lot
    }

    /// Convert a distance in points into a price distance.
    pub fn points_to_price(&self, points: Decimal) -> Decimal {
        points * self.point_size
    }

    /// Convert a price distance into points. Zero when `point_size` is unusable.
    pub fn price_to_points(&self, price_diff: Decimal) -> Decimal {
        if self.point_size <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        price_diff / self.point_size
    }
}
