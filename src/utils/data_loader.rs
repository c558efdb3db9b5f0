//! Delimited file loading and saving

use crate::error::{ForecastError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Rows sampled for schema inference
const INFER_SCHEMA_ROWS: usize = 100;

/// Reader for CSV and TSV files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned to infer column types; `None` scans the whole file
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(INFER_SCHEMA_ROWS),
        }
    }

    /// Rows scanned to infer column types; `None` scans the whole file
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a comma-separated file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        self.load_csv_with_options(path, b',', true, 0)
    }

    /// Load a delimited file with explicit options
    pub fn load_csv_with_options(
        &self,
        path: impl AsRef<Path>,
        delimiter: u8,
        has_header: bool,
        skip_rows: usize,
    ) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| ForecastError::DataError(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(has_header)
            .with_skip_rows(skip_rows)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| ForecastError::DataError(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded table");
        Ok(df)
    }

    /// Pick the delimiter from the extension: tab for `.tsv`, comma otherwise
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let is_tsv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"));
        let delimiter = if is_tsv { b'\t' } else { b',' };
        self.load_csv_with_options(path, delimiter, true, 0)
    }
}

/// Writer for result tables
pub struct DataSaver;

impl DataSaver {
    /// Write `df` as CSV with a header row
    pub fn save_csv(df: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path)?;
        let mut df = df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| ForecastError::DataError(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), rows = df.height(), "Saved table");
        Ok(())
    }
}
