//! Regressor trait, model variants and regression metrics

use super::linear_models::{LassoRegression, LinearRegression, RidgeRegression};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metric rows reported for every fold, in table order
pub const METRIC_NAMES: [&str; 4] = ["mae", "mse", "mape", "rmse"];

/// Trait for regression models
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Display name of the model
    fn name(&self) -> &'static str;
}

/// Supported model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Linear,
    Ridge,
    Lasso,
}

impl FromStr for ModelType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linear" | "linear_regression" | "ols" => Ok(ModelType::Linear),
            "ridge" => Ok(ModelType::Ridge),
            "lasso" => Ok(ModelType::Lasso),
            other => Err(ForecastError::InvalidParameter {
                name: "model".to_string(),
                value: other.to_string(),
                reason: "expected one of linear, ridge, lasso".to_string(),
            }),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelType::Linear => "linear",
            ModelType::Ridge => "ridge",
            ModelType::Lasso => "lasso",
        };
        f.write_str(name)
    }
}

/// Concrete regressor held by a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegressorKind {
    Linear(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
}

impl RegressorKind {
    /// Build an unfitted model; `alpha` is ignored for plain OLS.
    pub fn from_type(model_type: ModelType, alpha: f64) -> Self {
        match model_type {
            ModelType::Linear => RegressorKind::Linear(LinearRegression::new()),
            ModelType::Ridge => RegressorKind::Ridge(RidgeRegression::new(alpha)),
            ModelType::Lasso => RegressorKind::Lasso(LassoRegression::new(alpha)),
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            RegressorKind::Linear(_) => ModelType::Linear,
            RegressorKind::Ridge(_) => ModelType::Ridge,
            RegressorKind::Lasso(_) => ModelType::Lasso,
        }
    }

    /// Fitted coefficients, if any
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        match self {
            RegressorKind::Linear(m) => m.coefficients.as_ref(),
            RegressorKind::Ridge(m) => m.coefficients.as_ref(),
            RegressorKind::Lasso(m) => m.coefficients.as_ref(),
        }
    }

    /// Same hyper-parameters, no fitted state
    pub fn unfitted(&self) -> Self {
        match self {
            RegressorKind::Linear(m) => {
                RegressorKind::Linear(LinearRegression::new().with_fit_intercept(m.fit_intercept))
            }
            RegressorKind::Ridge(m) => RegressorKind::Ridge(RidgeRegression {
                coefficients: None,
                intercept: 0.0,
                ..m.clone()
            }),
            RegressorKind::Lasso(m) => RegressorKind::Lasso(LassoRegression {
                coefficients: None,
                intercept: 0.0,
                ..m.clone()
            }),
        }
    }
}

impl Regressor for RegressorKind {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            RegressorKind::Linear(m) => Regressor::fit(m, x, y),
            RegressorKind::Ridge(m) => Regressor::fit(m, x, y),
            RegressorKind::Lasso(m) => Regressor::fit(m, x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            RegressorKind::Linear(m) => Regressor::predict(m, x),
            RegressorKind::Ridge(m) => Regressor::predict(m, x),
            RegressorKind::Lasso(m) => Regressor::predict(m, x),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            RegressorKind::Linear(m) => m.name(),
            RegressorKind::Ridge(m) => m.name(),
            RegressorKind::Lasso(m) => m.name(),
        }
    }
}

impl From<LinearRegression> for RegressorKind {
    fn from(model: LinearRegression) -> Self {
        RegressorKind::Linear(model)
    }
}

impl From<RidgeRegression> for RegressorKind {
    fn from(model: RidgeRegression) -> Self {
        RegressorKind::Ridge(model)
    }
}

impl From<LassoRegression> for RegressorKind {
    fn from(model: LassoRegression) -> Self {
        RegressorKind::Lasso(model)
    }
}

/// Error metrics for one set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Mean Absolute Percentage Error, as a fraction
    pub mape: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Number of scored samples
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute regression metrics.
    ///
    /// MAPE divides by `max(|y|, f64::EPSILON)` so zero targets stay finite.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(ForecastError::ComputationError(
                "cannot score an empty prediction set".to_string(),
            ));
        }

        let n = y_true.len() as f64;
        let (abs_sum, sq_sum, pct_sum) = y_true.iter().zip(y_pred.iter()).fold(
            (0.0, 0.0, 0.0),
            |(abs_sum, sq_sum, pct_sum), (&t, &p)| {
                let err = t - p;
                (
                    abs_sum + err.abs(),
                    sq_sum + err * err,
                    pct_sum + err.abs() / t.abs().max(f64::EPSILON),
                )
            },
        );

        let mse = sq_sum / n;
        Ok(Self {
            mae: abs_sum / n,
            mse,
            mape: pct_sum / n,
            rmse: mse.sqrt(),
            n_samples: y_true.len(),
        })
    }

    /// Values in [`METRIC_NAMES`] order
    pub fn values(&self) -> [f64; 4] {
        [self.mae, self.mse, self.mape, self.rmse]
    }

    /// Look a metric up by its row name
    pub fn get(&self, name: &str) -> Option<f64> {
        METRIC_NAMES
            .iter()
            .position(|m| *m == name)
            .map(|i| self.values()[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![100.0, 200.0, 400.0];
        let y_pred = array![110.0, 180.0, 400.0];

        let metrics = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert_abs_diff_eq!(metrics.mae, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(metrics.mse, 500.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(metrics.rmse, (500.0f64 / 3.0).sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(metrics.mape, (0.1 + 0.1) / 3.0, epsilon = 1e-12);
        assert_eq!(metrics.get("mse"), Some(metrics.mse));
        assert_eq!(metrics.get("r2"), None);
    }

    #[test]
    fn test_metrics_length_mismatch() {
        let result = RegressionMetrics::compute(&array![1.0, 2.0], &array![1.0]);
        assert!(matches!(result, Err(ForecastError::ShapeError { .. })));
    }

    #[test]
    fn test_mape_zero_target_is_finite() {
        let metrics = RegressionMetrics::compute(&array![0.0], &array![1.0]).unwrap();
        assert!(metrics.mape.is_finite());
    }

    #[test]
    fn test_model_type_parse() {
        assert_eq!("Ridge".parse::<ModelType>().unwrap(), ModelType::Ridge);
        assert!("forest".parse::<ModelType>().is_err());
        assert_eq!(ModelType::Lasso.to_string(), "lasso");
    }

    #[test]
    fn test_unfitted_keeps_hyperparameters() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![2.0, 4.0, 6.0];
        let mut model = RegressorKind::from_type(ModelType::Ridge, 0.5);
        model.fit(&x, &y).unwrap();
        assert!(model.coefficients().is_some());

        let fresh = model.unfitted();
        assert!(fresh.coefficients().is_none());
        match fresh {
            RegressorKind::Ridge(m) => assert_eq!(m.alpha, 0.5),
            other => panic!("unexpected variant {:?}", other),
        }
    }
}
