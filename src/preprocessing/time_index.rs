//! Year-week period indexing for raw sales tables

use crate::error::{ForecastError, Result};
use crate::frame::IndexedFrame;
use crate::timeseries::DEFAULT_TIME_INDEX;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Day-first layouts accepted for the date column, tried in order
const DATE_FORMATS: [&str; 4] = ["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Days from 0001-01-01 (CE) to the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Turns a raw observation table into one indexed by (entity, year-week).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeIndexer {
    entity_column: String,
    date_column: String,
    time_index_name: String,
}

impl Default for TimeIndexer {
    fn default() -> Self {
        Self {
            entity_column: "store".to_string(),
            date_column: "date".to_string(),
            time_index_name: DEFAULT_TIME_INDEX.to_string(),
        }
    }
}

impl TimeIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_column(mut self, name: impl Into<String>) -> Self {
        self.entity_column = name.into().to_lowercase();
        self
    }

    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = name.into().to_lowercase();
        self
    }

    pub fn with_time_index_name(mut self, name: impl Into<String>) -> Self {
        self.time_index_name = name.into();
        self
    }

    pub fn time_index_name(&self) -> &str {
        &self.time_index_name
    }

    /// Lower-case the columns, derive the period key, index and sort.
    ///
    /// The date column is consumed; the result is indexed by
    /// `[entity_column, time_index_name]`.
    pub fn transform(&self, df: &DataFrame) -> Result<IndexedFrame> {
        let mut df = df.clone();
        let lowered: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        df.set_column_names(lowered)?;

        if df.column(&self.entity_column).is_err() {
            return Err(ForecastError::FeatureNotFound(self.entity_column.clone()));
        }
        let dates = df
            .column(&self.date_column)
            .map_err(|_| ForecastError::FeatureNotFound(self.date_column.clone()))?;

        let periods: Vec<i64> = parse_date_column(dates)?
            .into_iter()
            .map(year_week)
            .collect();

        df.with_column(Series::new(self.time_index_name.as_str().into(), periods))?;
        let df = df.drop(&self.date_column)?;
        let df = df.sort(
            [self.entity_column.as_str(), self.time_index_name.as_str()],
            SortMultipleOptions::default().with_maintain_order(true),
        )?;

        debug!(
            rows = df.height(),
            columns = df.width(),
            index = ?[&self.entity_column, &self.time_index_name],
            "Indexed observation table"
        );

        IndexedFrame::new(
            df,
            vec![self.entity_column.clone(), self.time_index_name.clone()],
        )
    }
}

/// Period key for a date: ISO year * 100 + ISO week.
///
/// The ISO year keeps the key monotonic across year boundaries
/// (2010-01-01 belongs to week 53 of 2009).
pub fn year_week(date: NaiveDate) -> i64 {
    let iso = date.iso_week();
    iso.year() as i64 * 100 + iso.week() as i64
}

/// Parse a day-first date string.
pub fn parse_day_first(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| ForecastError::DataError(format!("unparsable date '{}'", value)))
}

fn parse_date_column(column: &Column) -> Result<Vec<NaiveDate>> {
    match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(value) => parse_day_first(value),
                None => Err(ForecastError::DataError(format!("missing date at row {}", row))),
            })
            .collect(),
        DataType::Date => {
            let days = column.cast(&DataType::Int32)?;
            days.i32()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    value
                        .and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE))
                        .ok_or_else(|| ForecastError::DataError(format!("missing date at row {}", row)))
                })
                .collect()
        }
        other => Err(ForecastError::DataError(format!(
            "date column '{}' has unsupported type {}",
            column.name(),
            other
        ))),
    }
}
