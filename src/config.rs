//! Experiment configuration

use crate::error::{ForecastError, Result};
use crate::evaluation::{
    CrossValidateOptions, SalesPredictionFactory, MODEL_STEP, SCALER_NAME, TRANSFORM_STEP,
};
use crate::preprocessing::{ColumnTransformer, TimeIndexer};
use crate::timeseries::{TimeBasedSplit, DEFAULT_TIME_INDEX};
use crate::training::{ModelType, RegressorKind, Step};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a cross-validation experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Target column, matched case-insensitively
    pub target: String,

    /// Columns scaled by the default pipeline; `None` scales every feature
    pub cols_to_scale: Option<Vec<String>>,

    /// Number of walk-forward folds
    pub n_splits: usize,

    /// Distinct periods per test window
    pub test_size: usize,

    /// Periods the test window advances per fold
    pub step_size: usize,

    pub time_index_name: String,
    pub entity_column: String,
    pub date_column: String,

    /// Regressor at the end of the default pipeline
    pub model: ModelType,

    /// Regularization strength for ridge and lasso
    pub alpha: f64,

    /// Run folds on the rayon pool
    pub parallel: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            target: "weekly_sales".to_string(),
            cols_to_scale: Some(
                ["temperature", "fuel_price", "cpi", "unemployment"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            n_splits: 4,
            test_size: 8,
            step_size: 4,
            time_index_name: DEFAULT_TIME_INDEX.to_string(),
            entity_column: "store".to_string(),
            date_column: "date".to_string(),
            model: ModelType::Linear,
            alpha: 1.0,
            parallel: false,
        }
    }
}

impl ExperimentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config; absent fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_cols_to_scale(mut self, cols: Option<Vec<String>>) -> Self {
        self.cols_to_scale = cols;
        self
    }

    pub fn with_splits(mut self, n_splits: usize, test_size: usize, step_size: usize) -> Self {
        self.n_splits = n_splits;
        self.test_size = test_size;
        self.step_size = step_size;
        self
    }

    pub fn with_time_index_name(mut self, name: impl Into<String>) -> Self {
        self.time_index_name = name.into();
        self
    }

    pub fn with_entity_column(mut self, name: impl Into<String>) -> Self {
        self.entity_column = name.into();
        self
    }

    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = name.into();
        self
    }

    pub fn with_model(mut self, model: ModelType) -> Self {
        self.model = model;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check values that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(ForecastError::ConfigError("target must not be empty".to_string()));
        }
        for (name, value) in [
            ("n_splits", self.n_splits),
            ("test_size", self.test_size),
            ("step_size", self.step_size),
        ] {
            if value == 0 {
                return Err(ForecastError::ConfigError(format!(
                    "{} must be a positive integer",
                    name
                )));
            }
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(ForecastError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be a finite non-negative number".to_string(),
            });
        }
        if self.entity_column.eq_ignore_ascii_case(&self.date_column) {
            return Err(ForecastError::ConfigError(
                "entity and date columns must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn indexer(&self) -> TimeIndexer {
        TimeIndexer::new()
            .with_entity_column(&self.entity_column)
            .with_date_column(&self.date_column)
            .with_time_index_name(&self.time_index_name)
    }

    pub fn splitter(&self) -> Result<TimeBasedSplit> {
        Ok(TimeBasedSplit::new(self.n_splits, self.test_size, self.step_size)?
            .with_time_index_name(&self.time_index_name))
    }

    /// Factory with this config's indexer and default pipeline installed.
    pub fn factory(&self) -> Result<SalesPredictionFactory> {
        let mut factory = SalesPredictionFactory::new(&self.target).with_indexer(self.indexer());
        factory.initialize_pipeline(Some(self.pipeline_steps()), None)?;
        Ok(factory)
    }

    pub fn cv_options(&self) -> CrossValidateOptions {
        CrossValidateOptions::new()
            .with_return_results(true)
            .with_return_eval_df(true)
            .with_parallel(self.parallel)
    }

    fn pipeline_steps(&self) -> Vec<(String, Step)> {
        let cols = self
            .cols_to_scale
            .as_ref()
            .map(|cols| cols.iter().map(|c| c.to_lowercase()).collect());
        vec![
            (
                TRANSFORM_STEP.to_string(),
                ColumnTransformer::standard(SCALER_NAME, cols).into(),
            ),
            (
                MODEL_STEP.to_string(),
                RegressorKind::from_type(self.model, self.alpha).into(),
            ),
        ]
    }
}
