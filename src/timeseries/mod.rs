//! Time series module
//!
//! Provides time-respecting cross-validation over a named period index.

mod validation;

pub use validation::{CrossValidator, Fold, TimeBasedFolds, TimeBasedSplit, DEFAULT_TIME_INDEX};
