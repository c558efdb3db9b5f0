//! Model evaluation
//!
//! [`SalesPredictionFactory`] owns the preprocessing and pipeline for one
//! target and scores it with any [`CrossValidator`](crate::timeseries::CrossValidator).

mod factory;
mod summary;

pub use factory::{
    CrossValidateOptions, CvOutput, CvResults, SalesPredictionFactory, MODEL_STEP, SCALER_NAME,
    TRANSFORM_STEP,
};
pub use summary::{MetricSummary, AVG_COLUMN, METRIC_COLUMN};
