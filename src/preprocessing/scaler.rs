//! Feature scaling implementations

use super::Transformer;
use crate::error::{ForecastError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Robust scaling using median and IQR
    Robust,
    /// No scaling
    None,
}

/// Parameters for one fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    column: String,
    center: f64, // mean, min, or median
    scale: f64,  // std, range, or IQR
}

/// Per-column feature scaler.
///
/// Standard scaling uses the population standard deviation, so a constant
/// column maps to zero rather than NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn scaler_type(&self) -> &ScalerType {
        &self.scaler_type
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fitted columns, in fit order
    pub fn columns(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.column.as_str()).collect()
    }

    /// Same scaler type, no fitted state
    pub fn unfitted(&self) -> Self {
        Self::new(self.scaler_type.clone())
    }

    /// Fit the scaler on the named columns of `df`
    pub fn fit_columns(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let params = columns
            .iter()
            .map(|name| {
                let column = df
                    .column(name)
                    .map_err(|_| ForecastError::FeatureNotFound(name.clone()))?;
                self.compute_params(name, column.as_materialized_series())
            })
            .collect::<Result<Vec<_>>>()?;

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Scale every fitted column of `df`; other columns are left untouched.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForecastError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .map(|params| {
                let column = df
                    .column(&params.column)
                    .map_err(|_| ForecastError::FeatureNotFound(params.column.clone()))?;
                scale_series(column.as_materialized_series(), params)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }
        Ok(result)
    }

    fn compute_params(&self, name: &str, series: &Series) -> Result<ScalerParams> {
        let casted = series
            .cast(&DataType::Float64)
            .map_err(|e| ForecastError::DataError(format!("column '{}': {}", name, e)))?;
        let ca = casted.f64()?;

        let (center, scale) = match self.scaler_type {
            ScalerType::Standard => (ca.mean().unwrap_or(0.0), ca.std(0).unwrap_or(1.0)),
            ScalerType::MinMax => {
                let min = ca.min().unwrap_or(0.0);
                let max = ca.max().unwrap_or(1.0);
                (min, max - min)
            }
            ScalerType::Robust => {
                let median = ca.median().unwrap_or(0.0);
                let q1 = ca
                    .quantile(0.25, QuantileMethod::Linear)?
                    .unwrap_or(0.0);
                let q3 = ca
                    .quantile(0.75, QuantileMethod::Linear)?
                    .unwrap_or(1.0);
                (median, q3 - q1)
            }
            ScalerType::None => (0.0, 1.0),
        };

        Ok(ScalerParams {
            column: name.to_string(),
            center,
            scale: if scale == 0.0 || !scale.is_finite() { 1.0 } else { scale },
        })
    }
}

fn scale_series(series: &Series, params: &ScalerParams) -> Result<Series> {
    let casted = series
        .cast(&DataType::Float64)
        .map_err(|e| ForecastError::DataError(format!("column '{}': {}", params.column, e)))?;

    let scaled: Float64Chunked = casted
        .f64()?
        .into_iter()
        .map(|opt| opt.map(|v| (v - params.center) / params.scale))
        .collect();

    Ok(scaled.with_name(series.name().clone()).into_series())
}

impl Transformer for Scaler {
    /// Fits every column of `x`; the target is unused.
    fn fit(&mut self, x: &DataFrame, _y: &Array1<f64>) -> Result<()> {
        let columns: Vec<String> = x
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        self.fit_columns(x, &columns)?;
        Ok(())
    }

    fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        Scaler::transform(self, x)
    }
}
