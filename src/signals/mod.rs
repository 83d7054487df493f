//! Signal generation.
//!
//! The simulator never computes signals itself; it consumes a series produced
//! by a [`SignalSource`] for a given parameter set. Walk-forward validation
//! calls the source again for every slice and every candidate parameter set.

pub mod ema_crossover;

pub use ema_crossover::{ema, EmaCrossover};

use crate::data::{Candle, Signal};
use crate::walkforward::ParameterSet;

/// Produces one signal per candle for a parameter set.
///
/// Implementations must be deterministic and return exactly
/// `candles.len()` signals.
pub trait SignalSource: Sync {
    fn generate(&self, candles: &[Candle], params: &ParameterSet) -> Vec<Signal>;
}

impl<F> SignalSource for F
where
    F: Fn(&[Candle], &ParameterSet) -> Vec<Signal> + Sync,
{
    fn generate(&self, candles: &[Candle], params: &ParameterSet) -> Vec<Signal> {
        self(candles, params)
    }
}

/// Source that never signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFlat;

impl SignalSource for AlwaysFlat {
    fn generate(&self, candles: &[Candle], _params: &ParameterSet) -> Vec<Signal> {
        vec![Signal::Flat; candles.len()]
    }
}
