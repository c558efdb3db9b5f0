//! Column-subset transforms

use super::{Scaler, ScalerType, Transformer};
use crate::error::{ForecastError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What happens to columns no transform claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Remainder {
    /// Unclaimed columns are removed from the output
    Drop,
    /// Unclaimed columns are appended unchanged after the transformed ones
    Passthrough,
}

impl Default for Remainder {
    fn default() -> Self {
        Remainder::Drop
    }
}

/// A named scaler bound to a set of columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnTransform {
    pub name: String,
    pub scaler: Scaler,
    /// `None` selects every input column at fit time
    pub columns: Option<Vec<String>>,
}

/// Applies named scalers to column subsets and concatenates the results.
///
/// Output columns appear in transform order, then the remainder (if kept).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnTransformer {
    transforms: Vec<ColumnTransform>,
    remainder: Remainder,
    resolved: Vec<Vec<String>>,
    remainder_columns: Vec<String>,
    is_fitted: bool,
}

impl ColumnTransformer {
    pub fn new(transforms: Vec<ColumnTransform>) -> Self {
        Self {
            transforms,
            remainder: Remainder::default(),
            resolved: Vec::new(),
            remainder_columns: Vec::new(),
            is_fitted: false,
        }
    }

    /// Single standard scaler over `columns` (all columns when `None`).
    pub fn standard(name: impl Into<String>, columns: Option<Vec<String>>) -> Self {
        Self::new(vec![ColumnTransform {
            name: name.into(),
            scaler: Scaler::new(ScalerType::Standard),
            columns,
        }])
    }

    pub fn with_remainder(mut self, remainder: Remainder) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn transforms(&self) -> &[ColumnTransform] {
        &self.transforms
    }

    /// Column names the transformer emits, valid after fit
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.resolved.iter().flatten().cloned().collect();
        if self.remainder == Remainder::Passthrough {
            columns.extend(self.remainder_columns.iter().cloned());
        }
        columns
    }

    /// Same configuration, no fitted state
    pub fn unfitted(&self) -> Self {
        let transforms = self
            .transforms
            .iter()
            .map(|t| ColumnTransform {
                name: t.name.clone(),
                scaler: t.scaler.unfitted(),
                columns: t.columns.clone(),
            })
            .collect();
        Self::new(transforms).with_remainder(self.remainder)
    }
}

impl Transformer for ColumnTransformer {
    fn fit(&mut self, x: &DataFrame, _y: &Array1<f64>) -> Result<()> {
        let all_columns: Vec<String> = x
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let mut resolved = Vec::with_capacity(self.transforms.len());
        for transform in &mut self.transforms {
            let columns = transform
                .columns
                .clone()
                .unwrap_or_else(|| all_columns.clone());
            transform.scaler.fit_columns(x, &columns)?;
            debug!(step = %transform.name, columns = ?columns, "Fitted column transform");
            resolved.push(columns);
        }

        self.remainder_columns = all_columns
            .into_iter()
            .filter(|name| !resolved.iter().any(|cols| cols.contains(name)))
            .collect();
        self.resolved = resolved;
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForecastError::ModelNotFitted);
        }

        let mut columns: Vec<Column> = Vec::new();
        for (transform, names) in self.transforms.iter().zip(&self.resolved) {
            let subset = x.select(names.clone())?;
            let scaled = transform.scaler.transform(&subset)?;
            columns.extend(scaled.get_columns().iter().cloned());
        }

        if self.remainder == Remainder::Passthrough {
            for name in &self.remainder_columns {
                let column = x
                    .column(name)
                    .map_err(|_| ForecastError::FeatureNotFound(name.clone()))?;
                columns.push(column.clone());
            }
        }

        if columns.is_empty() {
            return Err(ForecastError::DataError(
                "column transformer produced no output columns".to_string(),
            ));
        }

        Ok(DataFrame::new(columns)?)
    }
}
