//! Tables keyed by a composite (entity, period) index
//!
//! Polars frames have no row index, so the index levels are kept as ordinary
//! columns and tracked by name. Feature views exclude them.

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// A `DataFrame` with named index levels.
#[derive(Debug, Clone)]
pub struct IndexedFrame {
    data: DataFrame,
    index: Vec<String>,
}

impl IndexedFrame {
    /// Wrap a frame, marking `index` columns as index levels.
    pub fn new(data: DataFrame, index: Vec<String>) -> Result<Self> {
        for (i, level) in index.iter().enumerate() {
            if data.column(level).is_err() {
                return Err(ForecastError::FeatureNotFound(level.clone()));
            }
            if index[..i].contains(level) {
                return Err(ForecastError::InvalidParameter {
                    name: "index".to_string(),
                    value: level.clone(),
                    reason: "index levels must be unique".to_string(),
                });
            }
        }
        Ok(Self { data, index })
    }

    /// Names of the index levels, outermost first.
    pub fn index_names(&self) -> &[String] {
        &self.index
    }

    pub fn has_level(&self, name: &str) -> bool {
        self.index.iter().any(|level| level == name)
    }

    /// Underlying frame including the index columns.
    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    /// Names of all non-index columns, in frame order.
    pub fn value_columns(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| !self.has_level(name))
            .collect()
    }

    /// Feature view: every non-index column.
    pub fn values(&self) -> Result<DataFrame> {
        Ok(self.data.select(self.value_columns())?)
    }

    /// Index columns only.
    pub fn index_frame(&self) -> Result<DataFrame> {
        Ok(self.data.select(self.index.clone())?)
    }

    /// Integer values of an index level, one per row.
    pub fn level_values(&self, name: &str) -> Result<Vec<i64>> {
        if !self.has_level(name) {
            return Err(ForecastError::FeatureNotFound(name.to_string()));
        }
        let column = self.data.column(name)?;
        if !column.dtype().is_integer() {
            return Err(ForecastError::DataError(format!(
                "index level '{}' must be integer, found {}",
                name,
                column.dtype()
            )));
        }
        let casted = column.cast(&DataType::Int64)?;
        casted
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| {
                    ForecastError::DataError(format!("null in index level '{}' at row {}", name, row))
                })
            })
            .collect()
    }

    /// A numeric column as a dense vector.
    pub fn column(&self, name: &str) -> Result<Array1<f64>> {
        let column = self
            .data
            .column(name)
            .map_err(|_| ForecastError::FeatureNotFound(name.to_string()))?;
        column_to_array(column)
    }

    /// Copy without the named value column. Index levels cannot be dropped.
    pub fn drop_column(&self, name: &str) -> Result<Self> {
        if self.has_level(name) {
            return Err(ForecastError::InvalidParameter {
                name: "column".to_string(),
                value: name.to_string(),
                reason: "cannot drop an index level".to_string(),
            });
        }
        let data = self
            .data
            .drop(name)
            .map_err(|_| ForecastError::FeatureNotFound(name.to_string()))?;
        Ok(Self {
            data,
            index: self.index.clone(),
        })
    }

    /// Rows at the given positions, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Result<Self> {
        let idx = IdxCa::from_vec(
            "idx".into(),
            rows.iter().map(|&row| row as IdxSize).collect(),
        );
        Ok(Self {
            data: self.data.take(&idx)?,
            index: self.index.clone(),
        })
    }
}

/// Convert a numeric column to `f64`, rejecting nulls.
pub fn column_to_array(column: &Column) -> Result<Array1<f64>> {
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| ForecastError::DataError(format!("column '{}': {}", column.name(), e)))?;
    let values = casted
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| {
                ForecastError::DataError(format!("null in column '{}' at row {}", column.name(), row))
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(Array1::from_vec(values))
}

/// Stack every column of `df` into a row-major feature matrix.
pub fn frame_to_matrix(df: &DataFrame) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((df.height(), df.width()));
    for (j, column) in df.get_columns().iter().enumerate() {
        let values = column_to_array(column)?;
        matrix.column_mut(j).assign(&values);
    }
    Ok(matrix)
}
