//! Risk management module.
//!
//! Provides:
//! - Instrument point/lot conventions
//! - Risk-based position sizing

pub mod instrument;
pub mod position_sizer;

pub use instrument::Instrument;
pub use position_sizer::{dynamic_lot_size, PositionSizer, SizingConfig};
