//! Sales prediction factory: preprocessing, training and cross-validation

use super::summary::MetricSummary;
use crate::error::{ForecastError, Result};
use crate::frame::IndexedFrame;
use crate::preprocessing::{ColumnTransformer, TimeIndexer};
use crate::timeseries::{CrossValidator, Fold};
use crate::training::{LinearRegression, Pipeline, RegressionMetrics, RegressorKind, Step};
use ndarray::{Array1, Axis};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Step name of the default scaling stage
pub const TRANSFORM_STEP: &str = "column_transformer";

/// Step name of the default model stage
pub const MODEL_STEP: &str = "model";

/// Name of the scaler inside the default column transformer
pub const SCALER_NAME: &str = "numerical_scaler";

/// What [`SalesPredictionFactory::cross_validate`] returns besides the summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossValidateOptions {
    /// Keep fitted pipelines, row indices and timings per fold
    pub return_results: bool,
    /// Keep per-fold true/pred tables
    pub return_eval_df: bool,
    /// Evaluate folds on the rayon pool
    pub parallel: bool,
}

impl CrossValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_return_results(mut self, enabled: bool) -> Self {
        self.return_results = enabled;
        self
    }

    pub fn with_return_eval_df(mut self, enabled: bool) -> Self {
        self.return_eval_df = enabled;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }
}

/// Raw per-fold artifacts, ordered by fold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvResults {
    /// Pipelines fitted on each fold's training rows
    pub estimators: Vec<Pipeline>,
    pub train_indices: Vec<Vec<usize>>,
    pub test_indices: Vec<Vec<usize>>,
    /// Fit durations in seconds
    pub fit_times: Vec<f64>,
    /// Predict-and-score durations in seconds
    pub score_times: Vec<f64>,
}

/// Output of a cross-validation run
#[derive(Debug, Clone)]
pub struct CvOutput {
    pub metric_summary: MetricSummary,
    pub results: Option<CvResults>,
    /// Per-fold tables: index levels, `true`, `pred` and 1-based `fold`
    pub eval_df: Option<Vec<DataFrame>>,
}

impl CvOutput {
    /// All eval tables stacked in fold order.
    pub fn eval_frame(&self) -> Result<Option<DataFrame>> {
        let Some(frames) = &self.eval_df else {
            return Ok(None);
        };
        let mut iter = frames.iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut stacked = first.clone();
        for frame in iter {
            stacked.vstack_mut(frame)?;
        }
        Ok(Some(stacked))
    }
}

struct FoldOutcome {
    estimator: Pipeline,
    metrics: RegressionMetrics,
    y_true: Array1<f64>,
    y_pred: Array1<f64>,
    fit_time: f64,
    score_time: f64,
}

/// Ties a sales table to a pipeline and a cross-validation scheme.
#[derive(Debug, Clone)]
pub struct SalesPredictionFactory {
    target: String,
    indexer: TimeIndexer,
    pipeline: Option<Pipeline>,
    results: Option<CvResults>,
}

impl SalesPredictionFactory {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into().to_lowercase(),
            indexer: TimeIndexer::default(),
            pipeline: None,
            results: None,
        }
    }

    pub fn with_indexer(mut self, indexer: TimeIndexer) -> Self {
        self.indexer = indexer;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn indexer(&self) -> &TimeIndexer {
        &self.indexer
    }

    /// The current pipeline, fitted once [`train`](Self::train) has run
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    /// Per-fold artifacts of the last `cross_validate` call with results enabled
    pub fn results(&self) -> Option<&CvResults> {
        self.results.as_ref()
    }

    /// Index a raw table by (entity, year-week).
    pub fn preprocessing(&self, df: &DataFrame) -> Result<IndexedFrame> {
        self.indexer.transform(df)
    }

    /// Separate the target column from the features.
    pub fn split_target(&self, table: &IndexedFrame) -> Result<(IndexedFrame, Array1<f64>)> {
        let y = table.column(&self.target)?;
        let features = table.drop_column(&self.target)?;
        Ok((features, y))
    }

    /// Install `steps`, or the default scaler + linear model when `None`.
    ///
    /// `cols_to_scale` only applies to the default steps; `None` scales every
    /// feature column.
    pub fn initialize_pipeline(
        &mut self,
        steps: Option<Vec<(String, Step)>>,
        cols_to_scale: Option<Vec<String>>,
    ) -> Result<&Pipeline> {
        let steps = match steps {
            Some(steps) => steps,
            None => vec![
                (
                    TRANSFORM_STEP.to_string(),
                    ColumnTransformer::standard(SCALER_NAME, cols_to_scale).into(),
                ),
                (
                    MODEL_STEP.to_string(),
                    RegressorKind::from(LinearRegression::new()).into(),
                ),
            ],
        };

        let pipeline = Pipeline::new(steps)?;
        debug!(steps = ?pipeline.step_names(), "Initialized pipeline");
        Ok(&*self.pipeline.insert(pipeline))
    }

    /// Fit the pipeline once on all of `x`, recording `target_name` as the
    /// factory's target column.
    pub fn train(
        &mut self,
        x: &IndexedFrame,
        y: &Array1<f64>,
        target_name: &str,
    ) -> Result<&Pipeline> {
        let values = x.values()?;
        self.target = target_name.to_lowercase();
        info!(target_column = %self.target, rows = values.height(), "Training pipeline");

        let pipeline = self.ensure_pipeline()?;
        let start = Instant::now();
        pipeline.fit(&values, y)?;
        debug!(elapsed_secs = start.elapsed().as_secs_f64(), "Trained pipeline");
        Ok(&*pipeline)
    }

    /// Predict with `estimator`, falling back to the factory's pipeline.
    pub fn predict(&self, x: &IndexedFrame, estimator: Option<&Pipeline>) -> Result<Array1<f64>> {
        let pipeline = estimator
            .or(self.pipeline.as_ref())
            .ok_or(ForecastError::ModelNotFitted)?;
        pipeline.predict(&x.values()?)
    }

    /// Fit and score a fresh copy of the pipeline on every fold of `cv`.
    ///
    /// Splitter configuration errors surface before any fold is fitted. The
    /// factory's own pipeline is left untouched.
    pub fn cross_validate<C: CrossValidator>(
        &mut self,
        x: &IndexedFrame,
        y: &Array1<f64>,
        cv: &C,
        options: CrossValidateOptions,
    ) -> Result<CvOutput> {
        if x.height() != y.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} target values", x.height()),
                actual: format!("{} target values", y.len()),
            });
        }

        let folds: Vec<Fold> = cv.split(x)?.collect();
        let template = self.ensure_pipeline()?.unfitted();
        let values = x.values()?;

        info!(
            n_splits = folds.len(),
            rows = x.height(),
            model = %template.model().model_type(),
            parallel = options.parallel,
            "Starting cross-validation"
        );
        let start = Instant::now();

        let outcomes: Vec<FoldOutcome> = if options.parallel {
            folds
                .par_iter()
                .map(|fold| evaluate_fold(&template, &values, y, fold))
                .collect::<Result<_>>()?
        } else {
            folds
                .iter()
                .map(|fold| evaluate_fold(&template, &values, y, fold))
                .collect::<Result<_>>()?
        };

        for (fold, outcome) in folds.iter().zip(&outcomes) {
            info!(
                fold = fold.fold + 1,
                train_rows = fold.train_indices.len(),
                test_rows = fold.test_indices.len(),
                mae = outcome.metrics.mae,
                rmse = outcome.metrics.rmse,
                "Fold evaluated"
            );
        }

        let metric_summary = MetricSummary::new(outcomes.iter().map(|o| o.metrics).collect())?;

        let eval_df = if options.return_eval_df {
            let frames = folds
                .iter()
                .zip(&outcomes)
                .map(|(fold, outcome)| eval_table(x, fold, outcome))
                .collect::<Result<Vec<_>>>()?;
            Some(frames)
        } else {
            None
        };

        let results = if options.return_results {
            let mut results = CvResults {
                estimators: Vec::with_capacity(outcomes.len()),
                train_indices: Vec::with_capacity(folds.len()),
                test_indices: Vec::with_capacity(folds.len()),
                fit_times: Vec::with_capacity(outcomes.len()),
                score_times: Vec::with_capacity(outcomes.len()),
            };
            for (fold, outcome) in folds.into_iter().zip(outcomes) {
                results.train_indices.push(fold.train_indices);
                results.test_indices.push(fold.test_indices);
                results.fit_times.push(outcome.fit_time);
                results.score_times.push(outcome.score_time);
                results.estimators.push(outcome.estimator);
            }
            self.results = Some(results.clone());
            Some(results)
        } else {
            None
        };

        info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            avg_mae = metric_summary.averages()[0],
            "Cross-validation complete"
        );

        Ok(CvOutput {
            metric_summary,
            results,
            eval_df,
        })
    }

    fn ensure_pipeline(&mut self) -> Result<&mut Pipeline> {
        if self.pipeline.is_none() {
            self.initialize_pipeline(None, None)?;
        }
        self.pipeline
            .as_mut()
            .ok_or_else(|| ForecastError::ConfigError("pipeline was not initialized".to_string()))
    }
}

fn evaluate_fold(
    template: &Pipeline,
    values: &DataFrame,
    y: &Array1<f64>,
    fold: &Fold,
) -> Result<FoldOutcome> {
    let x_train = take(values, &fold.train_indices)?;
    let x_test = take(values, &fold.test_indices)?;
    let y_train = y.select(Axis(0), &fold.train_indices);
    let y_true = y.select(Axis(0), &fold.test_indices);

    let mut estimator = template.unfitted();
    let start = Instant::now();
    estimator.fit(&x_train, &y_train)?;
    let fit_time = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let y_pred = estimator.predict(&x_test)?;
    let metrics = RegressionMetrics::compute(&y_true, &y_pred)?;
    let score_time = start.elapsed().as_secs_f64();

    Ok(FoldOutcome {
        estimator,
        metrics,
        y_true,
        y_pred,
        fit_time,
        score_time,
    })
}

fn take(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        rows.iter().map(|&row| row as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

fn eval_table(x: &IndexedFrame, fold: &Fold, outcome: &FoldOutcome) -> Result<DataFrame> {
    let mut table = x.take_rows(&fold.test_indices)?.index_frame()?;
    let fold_number = vec![(fold.fold + 1) as i64; outcome.y_true.len()];

    table.with_column(Series::new("true".into(), outcome.y_true.to_vec()))?;
    table.with_column(Series::new("pred".into(), outcome.y_pred.to_vec()))?;
    table.with_column(Series::new("fold".into(), fold_number))?;
    Ok(table)
}
