//! Candle and signal data.

pub mod loader;
pub mod types;

pub use loader::{parse_timestamp, DataLoader, LoaderError};
pub use types::{Candle, Side, Signal};
