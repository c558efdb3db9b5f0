//! Model training module
//!
//! Provides the regressors and the pipeline that chains feature transforms
//! into them:
//! - Linear models (OLS, Ridge, Lasso)
//! - Named-step pipelines with fresh-copy support for cross-validation
//! - Regression error metrics (MAE, MSE, MAPE, RMSE)

mod models;
mod pipeline;
pub mod linear_models;

pub use linear_models::{LassoRegression, LinearRegression, RidgeRegression};
pub use models::{ModelType, RegressionMetrics, Regressor, RegressorKind, METRIC_NAMES};
pub use pipeline::{Pipeline, Step, TransformStep};
