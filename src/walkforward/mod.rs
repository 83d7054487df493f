//! Walk-forward validation module.
//!
//! Implements rolling train/test validation:
//! - Train: `train_months` (parameter search, capped sample of the grid)
//! - Test: `test_months` immediately after (out-of-sample run)
//! - Roll: to the end of the tested window

pub mod optimizer;
pub mod params;
pub mod periods;

pub use optimizer::{
    consistency_score, walk_forward_validate, Verdict, WalkForwardOutcome, WalkForwardSummary,
    WalkForwardValidator, WalkForwardWindow,
};
pub use params::{ParamValue, ParameterGrid, ParameterSet};
pub use periods::{add_months, WalkForwardConfig, WalkForwardPeriods, WindowSplit};
