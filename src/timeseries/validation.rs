//! Time-based cross-validation
//!
//! Folds are built over the distinct values of a time index level rather than
//! over rows, so every entity observed in a period lands on the same side of
//! the split.

use crate::error::{ForecastError, Result};
use crate::frame::IndexedFrame;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default name of the time index level.
pub const DEFAULT_TIME_INDEX: &str = "year_week";

/// One train/test partition of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fold {
    /// Fold number (0-based)
    pub fold: usize,
    /// Position of the first test period within the sorted time range
    pub test_start: usize,
    /// Row positions used for training, ascending
    pub train_indices: Vec<usize>,
    /// Row positions used for testing, ascending
    pub test_indices: Vec<usize>,
    /// Time periods covered by the training rows
    pub train_periods: Vec<i64>,
    /// Time periods covered by the test rows
    pub test_periods: Vec<i64>,
}

/// Splitter seam used by the evaluator
pub trait CrossValidator {
    /// Fold sequence produced by [`CrossValidator::split`].
    type Folds: Iterator<Item = Fold>;

    /// Validate `table` against the configuration and return the folds.
    ///
    /// All validation happens here; the returned sequence never fails.
    fn split(&self, table: &IndexedFrame) -> Result<Self::Folds>;

    /// Number of folds produced by a successful split.
    fn get_n_splits(&self) -> usize;
}

/// Walk-forward splitter over a named time index level.
///
/// The test window holds `test_size` distinct periods and slides forward by
/// `step_size` periods per fold. The last fold always ends at the final
/// observed period; training data is every period before the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBasedSplit {
    n_splits: usize,
    test_size: usize,
    step_size: usize,
    time_index_name: String,
}

impl TimeBasedSplit {
    /// Create a splitter on the default `year_week` level.
    pub fn new(n_splits: usize, test_size: usize, step_size: usize) -> Result<Self> {
        for (name, value) in [
            ("n_splits", n_splits),
            ("test_size", test_size),
            ("step_size", step_size),
        ] {
            if value == 0 {
                return Err(ForecastError::ConfigError(format!(
                    "{} must be a positive integer",
                    name
                )));
            }
        }

        Ok(Self {
            n_splits,
            test_size,
            step_size,
            time_index_name: DEFAULT_TIME_INDEX.to_string(),
        })
    }

    /// Use a different time index level.
    pub fn with_time_index_name(mut self, name: impl Into<String>) -> Self {
        self.time_index_name = name.into();
        self
    }

    pub fn test_size(&self) -> usize {
        self.test_size
    }

    pub fn step_size(&self) -> usize {
        self.step_size
    }

    pub fn time_index_name(&self) -> &str {
        &self.time_index_name
    }

    /// Number of distinct periods the folds need beyond the first training period.
    ///
    /// Fails with a config error when the window does not fit in a `usize`.
    pub fn min_required_size(&self) -> Result<usize> {
        self.n_splits
            .checked_sub(1)
            .and_then(|steps| steps.checked_mul(self.step_size))
            .and_then(|span| span.checked_add(self.test_size))
            .ok_or_else(|| {
                ForecastError::ConfigError(format!(
                    "window of {} splits, test_size {} and step_size {} overflows",
                    self.n_splits, self.test_size, self.step_size
                ))
            })
    }
}

impl CrossValidator for TimeBasedSplit {
    type Folds = TimeBasedFolds;

    fn split(&self, table: &IndexedFrame) -> Result<TimeBasedFolds> {
        if !table.has_level(&self.time_index_name) {
            return Err(ForecastError::ConfigError(format!(
                "table must contain '{}' in its index, found {:?}",
                self.time_index_name,
                table.index_names()
            )));
        }

        let time_idx = table
            .level_values(&self.time_index_name)
            .map_err(|e| ForecastError::ConfigError(e.to_string()))?;

        let mut time_range = time_idx.clone();
        time_range.sort_unstable();
        time_range.dedup();

        let min_required_size = self.min_required_size()?;
        if min_required_size >= time_range.len() {
            return Err(ForecastError::ConfigError(format!(
                "time range of {} periods is smaller than the minimal required {}",
                time_range.len(),
                min_required_size
            )));
        }

        debug!(
            periods = time_range.len(),
            first = time_range[0],
            last = time_range[time_range.len() - 1],
            n_splits = self.n_splits,
            "Time-based split prepared"
        );

        Ok(TimeBasedFolds {
            time_idx,
            test_start: time_range.len() - min_required_size,
            time_range,
            test_size: self.test_size,
            step_size: self.step_size,
            fold: 0,
            n_splits: self.n_splits,
        })
    }

    fn get_n_splits(&self) -> usize {
        self.n_splits
    }
}

/// Lazy fold sequence returned by [`TimeBasedSplit`].
#[derive(Debug, Clone)]
pub struct TimeBasedFolds {
    time_idx: Vec<i64>,
    time_range: Vec<i64>,
    test_start: usize,
    test_size: usize,
    step_size: usize,
    fold: usize,
    n_splits: usize,
}

impl TimeBasedFolds {
    /// Sorted distinct periods the folds are drawn from.
    pub fn time_range(&self) -> &[i64] {
        &self.time_range
    }
}

impl Iterator for TimeBasedFolds {
    type Item = Fold;

    fn next(&mut self) -> Option<Fold> {
        if self.fold >= self.n_splits {
            return None;
        }

        let test_start = self.test_start;
        let test_end = test_start.saturating_add(self.test_size);
        let train_periods = self.time_range[..test_start].to_vec();
        let test_periods = self.time_range[test_start..test_end].to_vec();

        // time_range is sorted and distinct, so set membership reduces to bounds
        let first_test = test_periods[0];
        let last_test = test_periods[test_periods.len() - 1];

        let mut train_indices = Vec::new();
        let mut test_indices = Vec::new();
        for (row, &period) in self.time_idx.iter().enumerate() {
            if period < first_test {
                train_indices.push(row);
            } else if period <= last_test {
                test_indices.push(row);
            }
        }

        debug!(
            fold = self.fold,
            train_periods = train_periods.len(),
            test_from = first_test,
            test_to = last_test,
            "Yielding fold"
        );

        let fold = Fold {
            fold: self.fold,
            test_start,
            train_indices,
            test_indices,
            train_periods,
            test_periods,
        };

        self.test_start = self.test_start.saturating_add(self.step_size);
        self.fold += 1;
        Some(fold)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_splits - self.fold;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimeBasedFolds {}
