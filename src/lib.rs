//! Sales Forecast - walk-forward evaluation of weekly sales models
//!
//! This crate provides:
//! - Loading and period indexing of store/week sales tables
//! - A time-based walk-forward splitter over distinct periods
//! - Scaling + regression pipelines and a cross-validation evaluator
//! - A command-line interface
//!
//! # Modules
//!
//! - [`frame`] - Tables keyed by (entity, period)
//! - [`preprocessing`] - Year-week indexing, scalers, column transformer
//! - [`timeseries`] - Time-based cross-validation
//! - [`training`] - Linear models, pipelines, regression metrics
//! - [`evaluation`] - Sales prediction factory and metric summaries
//! - [`config`] - Experiment configuration
//! - [`utils`] - Data loading
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod frame;

// Core ML modules
pub mod preprocessing;
pub mod timeseries;
pub mod training;
pub mod evaluation;

pub mod config;
pub mod utils;

// Services
pub mod cli;

pub use error::{ForecastError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ForecastError, Result};
    pub use crate::frame::IndexedFrame;

    pub use crate::preprocessing::{ColumnTransformer, Remainder, Scaler, ScalerType, TimeIndexer, Transformer};
    pub use crate::timeseries::{CrossValidator, Fold, TimeBasedSplit};
    pub use crate::training::{
        LassoRegression, LinearRegression, ModelType, Pipeline, RegressionMetrics, Regressor,
        RegressorKind, RidgeRegression, Step,
    };
    pub use crate::evaluation::{CrossValidateOptions, CvOutput, MetricSummary, SalesPredictionFactory};

    pub use crate::config::ExperimentConfig;
    pub use crate::utils::DataLoader;
}
