//! EMA crossover signal source with optional trend and fair-value-gap filters.
//!
//! - Long on a bullish cross: fast EMA moves above slow EMA
//! - Short on a bearish cross: fast EMA moves below slow EMA
//! - Trend filter: longs only above EMA(trend), shorts only below it
//! - FVG filter: longs only with a bullish gap (`low - high[i-2]`) in the
//!   last `fvg_lookback` candles, shorts with a bearish gap (`low[i-2] - high`)

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::data::{Candle, Signal};
use crate::risk::Instrument;
use crate::walkforward::ParameterSet;

use super::SignalSource;

/// Exponential moving average, seeded with the first value.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);

    let mut out = Vec::with_capacity(values.len());
    let mut prev = first;
    for &v in values {
        prev += alpha * (v - prev);
        out.push(prev);
    }
    out
}

/// EMA crossover source.
///
/// Reads `ema_fast`, `ema_slow`, `use_trend_filter` and `use_fvg_filter`
/// from the parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaCrossover {
    pub default_fast: usize,
    pub default_slow: usize,
    pub trend_period: usize,
    pub fvg_min_points: Decimal,
    pub fvg_lookback: usize,
    /// Price of one point for the FVG threshold. Taken from the instrument,
    /// never from config.
    #[serde(skip, default = "default_point_size")]
    pub point_size: Decimal,
}

fn default_point_size() -> Decimal {
    Instrument::default().point_size
}

impl Default for EmaCrossover {
    fn default() -> Self {
        Self {
            default_fast: 5,
            default_slow: 20,
            trend_period: 200,
            fvg_min_points: dec!(20),
            fvg_lookback: 10,
            point_size: default_point_size(),
        }
    }
}

impl EmaCrossover {
    /// Bind the FVG threshold to the instrument's point size.
    pub fn for_instrument(self, instrument: &Instrument) -> Self {
        Self {
            point_size: instrument.sanitized().point_size,
            ..self
        }
    }

    fn period(params: &ParameterSet, name: &str, default: usize) -> usize {
        let value = params.get_i64(name, default as i64);
        usize::try_from(value).ok().filter(|p| *p > 0).unwrap_or(default)
    }

    /// Per-candle flags: a qualifying gap closed on this candle.
    fn gaps(&self, candles: &[Candle]) -> (Vec<bool>, Vec<bool>) {
        let min_gap = self.fvg_min_points * self.point_size;
        let mut bullish = vec![false; candles.len()];
        let mut bearish = vec![false; candles.len()];

        for i in 2..candles.len() {
            bullish[i] = candles[i].low - candles[i - 2].high > min_gap;
            bearish[i] = candles[i - 2].low - candles[i].high > min_gap;
        }
        (bullish, bearish)
    }

    fn recent(flags: &[bool], i: usize, lookback: usize) -> bool {
        let start = (i + 1).saturating_sub(lookback.max(1));
        flags[start..=i].iter().any(|f| *f)
    }
}

impl SignalSource for EmaCrossover {
    fn generate(&self, candles: &[Candle], params: &ParameterSet) -> Vec<Signal> {
        let fast_period = Self::period(params, "ema_fast", self.default_fast);
        let slow_period = Self::period(params, "ema_slow", self.default_slow);
        let use_trend = params.get_bool("use_trend_filter", false);
        let use_fvg = params.get_bool("use_fvg_filter", false);

        let closes: Vec<f64> = candles
            .iter()
            .map(|c| c.close.to_f64().unwrap_or(0.0))
            .collect();
        let fast = ema(&closes, fast_period);
        let slow = ema(&closes, slow_period);
        let trend = ema(&closes, self.trend_period);
        let (bull_gaps, bear_gaps) = if use_fvg {
            self.gaps(candles)
        } else {
            (Vec::new(), Vec::new())
        };

        let mut signals = vec![Signal::Flat; candles.len()];
        for i in 1..candles.len() {
            let bull_cross = fast[i] > slow[i] && fast[i - 1] <= slow[i - 1];
            let bear_cross = fast[i] < slow[i] && fast[i - 1] >= slow[i - 1];

            let long_ok = (!use_trend || closes[i] > trend[i])
                && (!use_fvg || Self::recent(&bull_gaps, i, self.fvg_lookback));
            let short_ok = (!use_trend || closes[i] < trend[i])
                && (!use_fvg || Self::recent(&bear_gaps, i, self.fvg_lookback));

            if bull_cross && long_ok {
                signals[i] = Signal::Long;
            } else if bear_cross && short_ok {
                signals[i] = Signal::Short;
            }
        }
        signals
    }
}
