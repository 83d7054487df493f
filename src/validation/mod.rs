//! Input validation.
//!
//! Malformed series are rejected here, at the boundary, and surfaced to the
//! caller as a [`ValidationError`] rather than being simulated.

pub mod series;

pub use series::{
    validate_candles, validate_series, CheckResult, IntegrityReport, ValidationError,
};
