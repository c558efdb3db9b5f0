//! Linear model implementations

use super::models::Regressor;
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve `A x = b` for symmetric `A` via Cholesky, retrying once with a small
/// diagonal jitter when `A` is only semi-definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let l = cholesky_factor(a).or_else(|| {
        let jitter = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
        let mut regularized = a.clone();
        regularized.diag_mut().mapv_inplace(|v| v + jitter);
        cholesky_factor(&regularized)
    })?;

    // L y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gaussian elimination with partial pivoting, used when Cholesky fails.
fn gaussian_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut m = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        let pivot = (col..n).max_by(|&r1, &r2| {
            m[[r1, col]]
                .abs()
                .partial_cmp(&m[[r2, col]].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if m[[pivot, col]].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for j in 0..n {
                m.swap([col, j], [pivot, j]);
            }
            rhs.swap(col, pivot);
        }

        for row in (col + 1)..n {
            let factor = m[[row, col]] / m[[col, col]];
            for j in col..n {
                m[[row, j]] -= factor * m[[col, j]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| m[[i, j]] * x[j]).sum();
        x[i] = (rhs[i] - sum) / m[[i, i]];
    }
    Some(x)
}

/// Solve `(X^T X + l2 I) w = X^T y`.
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, l2: f64) -> Result<Array1<f64>> {
    let mut xtx = x.t().dot(x);
    if l2 > 0.0 {
        xtx.diag_mut().mapv_inplace(|v| v + l2);
    }
    let xty = x.t().dot(y);

    cholesky_solve(&xtx, &xty)
        .or_else(|| gaussian_solve(&xtx, &xty))
        .ok_or_else(|| {
            ForecastError::ComputationError(
                "Matrix is singular, cannot solve normal equations".to_string(),
            )
        })
}

/// Training data shifted to zero mean when an intercept is fitted.
struct Centered {
    x: Array2<f64>,
    y: Array1<f64>,
    x_mean: Option<Array1<f64>>,
    y_mean: f64,
}

impl Centered {
    fn new(x: &Array2<f64>, y: &Array1<f64>, fit_intercept: bool) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(ForecastError::TrainingError(
                "cannot fit on an empty training set".to_string(),
            ));
        }

        if !fit_intercept {
            return Ok(Self {
                x: x.clone(),
                y: y.clone(),
                x_mean: None,
                y_mean: 0.0,
            });
        }

        let x_mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            ForecastError::TrainingError("cannot center an empty feature matrix".to_string())
        })?;
        let y_mean = y.mean().unwrap_or(0.0);
        Ok(Self {
            x: x - &x_mean.clone().insert_axis(Axis(0)),
            y: y - y_mean,
            x_mean: Some(x_mean),
            y_mean,
        })
    }

    fn intercept(&self, coefficients: &Array1<f64>) -> f64 {
        match &self.x_mean {
            Some(x_mean) => self.y_mean - coefficients.dot(x_mean),
            None => 0.0,
        }
    }
}

fn linear_predict(coefficients: Option<&Array1<f64>>, intercept: f64, x: &Array2<f64>) -> Result<Array1<f64>> {
    let coefficients = coefficients.ok_or(ForecastError::ModelNotFitted)?;
    if x.ncols() != coefficients.len() {
        return Err(ForecastError::ShapeError {
            expected: format!("{} features", coefficients.len()),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(x.dot(coefficients) + intercept)
}

/// Ordinary least squares regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let data = Centered::new(x, y, self.fit_intercept)?;
        let coefficients = solve_normal_equations(&data.x, &data.y, 0.0)?;
        self.intercept = data.intercept(&coefficients);
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x)
    }
}

/// Ridge Regression (L2-regularized linear regression)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
    pub fit_intercept: bool,
    /// L2 regularization strength
    pub alpha: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            alpha,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if self.alpha < 0.0 {
            return Err(ForecastError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        let data = Centered::new(x, y, self.fit_intercept)?;
        let coefficients = solve_normal_equations(&data.x, &data.y, self.alpha)?;
        self.intercept = data.intercept(&coefficients);
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x)
    }
}

/// Lasso Regression (L1-regularized via coordinate descent)
///
/// Minimizes `1/(2n) ||y - Xw||^2 + alpha ||w||_1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
    pub fit_intercept: bool,
    /// L1 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            alpha,
            max_iter: 1000,
            tol: 1e-6,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if self.alpha < 0.0 {
            return Err(ForecastError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        let data = Centered::new(x, y, self.fit_intercept)?;
        let n_features = data.x.ncols();

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| data.x.column(j).mapv(|v| v * v).sum())
            .collect();
        let lambda = self.alpha * data.x.nrows() as f64;

        let mut w = Array1::zeros(n_features);
        let mut residual = data.y.clone();

        for _ in 0..self.max_iter {
            let mut max_change = 0.0f64;
            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let column = data.x.column(j);
                let rho = column.dot(&residual) + col_norms[j] * w[j];
                let updated = Self::soft_threshold(rho, lambda) / col_norms[j];
                let delta = w[j] - updated;
                if delta != 0.0 {
                    residual.scaled_add(delta, &column);
                    w[j] = updated;
                    max_change = max_change.max(delta.abs());
                }
            }
            if max_change < self.tol {
                break;
            }
        }

        self.intercept = data.intercept(&w);
        self.coefficients = Some(w);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x)
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LinearRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LinearRegression::predict(self, x)
    }

    fn name(&self) -> &'static str {
        "LinearRegression"
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RidgeRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RidgeRegression::predict(self, x)
    }

    fn name(&self) -> &'static str {
        "Ridge"
    }
}

impl Regressor for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LassoRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LassoRegression::predict(self, x)
    }

    fn name(&self) -> &'static str {
        "Lasso"
    }
}
