//! Per-fold metric summary table

use crate::error::{ForecastError, Result};
use crate::training::{RegressionMetrics, METRIC_NAMES};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Name of the label column in [`MetricSummary::to_dataframe`]
pub const METRIC_COLUMN: &str = "metric";

/// Name of the cross-fold average column
pub const AVG_COLUMN: &str = "avg";

/// Metrics for every fold plus their average.
///
/// Tabulated with one row per metric (`mae`, `mse`, `mape`, `rmse`), one column
/// per fold (`fold_1`, `fold_2`, ...) and a trailing `avg` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    folds: Vec<RegressionMetrics>,
}

impl MetricSummary {
    pub fn new(folds: Vec<RegressionMetrics>) -> Result<Self> {
        if folds.is_empty() {
            return Err(ForecastError::ComputationError(
                "metric summary needs at least one fold".to_string(),
            ));
        }
        Ok(Self { folds })
    }

    pub fn n_folds(&self) -> usize {
        self.folds.len()
    }

    /// Metrics of fold `fold` (0-based)
    pub fn fold(&self, fold: usize) -> Option<&RegressionMetrics> {
        self.folds.get(fold)
    }

    pub fn folds(&self) -> &[RegressionMetrics] {
        &self.folds
    }

    /// Column names for the per-fold values
    pub fn fold_columns(&self) -> Vec<String> {
        (1..=self.folds.len()).map(|i| format!("fold_{}", i)).collect()
    }

    /// Unweighted mean of `metric` across folds
    pub fn average(&self, metric: &str) -> Option<f64> {
        let values: Vec<f64> = self
            .folds
            .iter()
            .map(|m| m.get(metric))
            .collect::<Option<Vec<_>>>()?;
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Averages in metric-row order
    pub fn averages(&self) -> [f64; 4] {
        let mut avg = [0.0; 4];
        for metrics in &self.folds {
            for (slot, value) in avg.iter_mut().zip(metrics.values()) {
                *slot += value;
            }
        }
        avg.map(|total| total / self.folds.len() as f64)
    }

    /// Tabulate as a frame: `metric`, one column per fold, then `avg`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.folds.len() + 2);
        columns.push(Series::new(METRIC_COLUMN.into(), METRIC_NAMES.to_vec()).into());

        for (name, metrics) in self.fold_columns().into_iter().zip(&self.folds) {
            columns.push(Series::new(name.into(), metrics.values().to_vec()).into());
        }
        columns.push(Series::new(AVG_COLUMN.into(), self.averages().to_vec()).into());

        Ok(DataFrame::new(columns)?)
    }
}
