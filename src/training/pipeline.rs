//! Fit/predict pipelines of named steps

use super::models::{Regressor, RegressorKind};
use crate::error::{ForecastError, Result};
use crate::frame::frame_to_matrix;
use crate::preprocessing::{ColumnTransformer, Scaler, Transformer};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Transform variants usable ahead of the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransformStep {
    ColumnTransformer(ColumnTransformer),
    Scaler(Scaler),
}

impl TransformStep {
    fn unfitted(&self) -> Self {
        match self {
            TransformStep::ColumnTransformer(ct) => TransformStep::ColumnTransformer(ct.unfitted()),
            TransformStep::Scaler(s) => TransformStep::Scaler(s.unfitted()),
        }
    }
}

impl Transformer for TransformStep {
    fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<()> {
        match self {
            TransformStep::ColumnTransformer(ct) => ct.fit(x, y),
            TransformStep::Scaler(s) => Transformer::fit(s, x, y),
        }
    }

    fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        match self {
            TransformStep::ColumnTransformer(ct) => ct.transform(x),
            TransformStep::Scaler(s) => Transformer::transform(s, x),
        }
    }
}

/// One pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Step {
    Transform(TransformStep),
    Model(RegressorKind),
}

impl From<ColumnTransformer> for Step {
    fn from(ct: ColumnTransformer) -> Self {
        Step::Transform(TransformStep::ColumnTransformer(ct))
    }
}

impl From<Scaler> for Step {
    fn from(scaler: Scaler) -> Self {
        Step::Transform(TransformStep::Scaler(scaler))
    }
}

impl From<RegressorKind> for Step {
    fn from(model: RegressorKind) -> Self {
        Step::Model(model)
    }
}

/// Ordered transforms followed by a single regressor.
///
/// `fit` feeds each transform the previous output; the last output is
/// densified into a matrix for the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    transforms: Vec<(String, TransformStep)>,
    model_name: String,
    model: RegressorKind,
    is_fitted: bool,
}

impl Pipeline {
    /// Build a pipeline; the last step must be the only model step.
    pub fn new(steps: Vec<(String, Step)>) -> Result<Self> {
        let mut steps = steps;
        let (model_name, last) = steps.pop().ok_or_else(|| {
            ForecastError::ConfigError("pipeline needs at least one step".to_string())
        })?;

        let model = match last {
            Step::Model(model) => model,
            Step::Transform(_) => {
                return Err(ForecastError::ConfigError(format!(
                    "last pipeline step '{}' must be a model",
                    model_name
                )))
            }
        };

        let mut transforms = Vec::with_capacity(steps.len());
        for (name, step) in steps {
            if name == model_name || transforms.iter().any(|(n, _): &(String, TransformStep)| *n == name) {
                return Err(ForecastError::ConfigError(format!(
                    "duplicate pipeline step name '{}'",
                    name
                )));
            }
            match step {
                Step::Transform(t) => transforms.push((name, t)),
                Step::Model(_) => {
                    return Err(ForecastError::ConfigError(format!(
                        "step '{}' is a model but only the last step may be one",
                        name
                    )))
                }
            }
        }

        Ok(Self {
            transforms,
            model_name,
            model,
            is_fitted: false,
        })
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.transforms
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(std::iter::once(self.model_name.as_str()))
            .collect()
    }

    pub fn transform_step(&self, name: &str) -> Option<&TransformStep> {
        self.transforms
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, step)| step)
    }

    pub fn model(&self) -> &RegressorKind {
        &self.model
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Same steps and hyper-parameters, no fitted state
    pub fn unfitted(&self) -> Self {
        Self {
            transforms: self
                .transforms
                .iter()
                .map(|(name, step)| (name.clone(), step.unfitted()))
                .collect(),
            model_name: self.model_name.clone(),
            model: self.model.unfitted(),
            is_fitted: false,
        }
    }

    /// Fit every step in order.
    pub fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<&mut Self> {
        if x.height() != y.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} target values", x.height()),
                actual: format!("{} target values", y.len()),
            });
        }

        let mut current = x.clone();
        for (name, step) in &mut self.transforms {
            current = step.fit_transform(&current, y)?;
            debug!(step = %name, columns = current.width(), "Fitted transform step");
        }

        let matrix = frame_to_matrix(&current)?;
        self.model.fit(&matrix, y)?;
        debug!(step = %self.model_name, model = self.model.name(), rows = matrix.nrows(), "Fitted model step");

        self.is_fitted = true;
        Ok(self)
    }

    /// Run the fitted transforms, then predict with the model.
    pub fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(ForecastError::ModelNotFitted);
        }

        let mut current = x.clone();
        for (_, step) in &self.transforms {
            current = step.transform(&current)?;
        }
        self.model.predict(&frame_to_matrix(&current)?)
    }
}
