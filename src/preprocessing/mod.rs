//! Data preprocessing module
//!
//! Provides the table normalization and feature transforms used ahead of the
//! regressors:
//! - Year-week period indexing of raw observation tables
//! - Feature scaling (StandardScaler, MinMaxScaler, RobustScaler)
//! - Column-subset transforms with drop/passthrough remainder

mod column_transformer;
mod scaler;
mod time_index;

pub use column_transformer::{ColumnTransform, ColumnTransformer, Remainder};
pub use scaler::{Scaler, ScalerType};
pub use time_index::{parse_day_first, year_week, TimeIndexer};

use crate::error::Result;
use ndarray::Array1;
use polars::prelude::*;

/// A fittable feature transform, run ahead of the model in a pipeline
pub trait Transformer: Send + Sync {
    /// Learn transform parameters from training features
    fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<()>;

    /// Apply fitted parameters
    fn transform(&self, x: &DataFrame) -> Result<DataFrame>;

    fn fit_transform(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<DataFrame> {
        self.fit(x, y)?;
        self.transform(x)
    }
}
