//! Integration test: sales prediction factory cross-validation end-to-end

use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate};
use sales_forecast::error::ForecastError;
use sales_forecast::evaluation::{CrossValidateOptions, SalesPredictionFactory};
use sales_forecast::preprocessing::ColumnTransformer;
use sales_forecast::timeseries::TimeBasedSplit;
use sales_forecast::training::{
    LassoRegression, ModelType, RegressorKind, RidgeRegression, Step, METRIC_NAMES,
};
use polars::prelude::*;

const SCALED: [&str; 4] = ["temperature", "fuel_price", "cpi", "unemployment"];

/// Raw weekly sales for three stores; sales are an exact linear function of
/// the four scaled features.
fn raw_sales(n_weeks: usize) -> DataFrame {
    let start = NaiveDate::from_ymd_opt(2010, 2, 5).unwrap();
    let mut store = Vec::new();
    let mut date = Vec::new();
    let mut sales = Vec::new();
    let mut holiday = Vec::new();
    let mut temperature = Vec::new();
    let mut fuel_price = Vec::new();
    let mut cpi = Vec::new();
    let mut unemployment = Vec::new();

    for s in 1..=3i64 {
        for w in 0..n_weeks {
            let t = 40.0 + 20.0 * ((w as f64) * 0.5 + s as f64).sin();
            let f = 2.5 + 0.1 * ((w * 3 + s as usize * 7) % 10) as f64;
            let c = 210.0 + 0.3 * w as f64 + s as f64;
            let u = 8.0 + 0.1 * ((w * 5 + s as usize * 2) % 7) as f64;

            store.push(s);
            date.push((start + Duration::weeks(w as i64)).format("%d-%m-%Y").to_string());
            holiday.push((w % 13 == 0) as i64);
            temperature.push(t);
            fuel_price.push(f);
            cpi.push(c);
            unemployment.push(u);
            sales.push(20_000.0 + 150.0 * t - 3_000.0 * f + 40.0 * c - 900.0 * u);
        }
    }

    df!(
        "Store" => store,
        "Date" => date,
        "Weekly_Sales" => sales,
        "Holiday_Flag" => holiday,
        "Temperature" => temperature,
        "Fuel_Price" => fuel_price,
        "CPI" => cpi,
        "Unemployment" => unemployment
    )
    .unwrap()
}

fn scaled_columns() -> Option<Vec<String>> {
    Some(SCALED.iter().map(|s| s.to_string()).collect())
}

fn prepared(n_weeks: usize) -> (SalesPredictionFactory, sales_forecast::frame::IndexedFrame, ndarray::Array1<f64>) {
    let mut factory = SalesPredictionFactory::new("weekly_sales");
    let table = factory.preprocessing(&raw_sales(n_weeks)).unwrap();
    let (x, y) = factory.split_target(&table).unwrap();
    factory.initialize_pipeline(None, scaled_columns()).unwrap();
    (factory, x, y)
}

#[test]
fn test_metric_summary_layout() {
    let (mut factory, x, y) = prepared(30);
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();

    let output = factory
        .cross_validate(&x, &y, &cv, CrossValidateOptions::new())
        .unwrap();
    let summary = output.metric_summary.to_dataframe().unwrap();

    let names: Vec<String> = summary
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, vec!["metric", "fold_1", "fold_2", "fold_3", "fold_4", "avg"]);
    assert_eq!(summary.height(), METRIC_NAMES.len());

    let metrics: Vec<&str> = summary
        .column("metric")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(metrics, vec!["mae", "mse", "mape", "rmse"]);

    // avg is the mean of the fold columns
    let fold_values: Vec<Vec<f64>> = ["fold_1", "fold_2", "fold_3", "fold_4"]
        .iter()
        .map(|name| {
            summary
                .column(name)
                .unwrap()
                .f64()
                .unwrap()
                .into_iter()
                .flatten()
                .collect()
        })
        .collect();
    let avg: Vec<f64> = summary
        .column("avg")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    for (row, avg) in avg.iter().enumerate() {
        let mean = fold_values.iter().map(|fold| fold[row]).sum::<f64>() / 4.0;
        assert_abs_diff_eq!(mean, *avg, epsilon = 1e-9);
    }
}

#[test]
fn test_linear_sales_are_recovered() {
    let (mut factory, x, y) = prepared(30);
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();

    let output = factory
        .cross_validate(&x, &y, &cv, CrossValidateOptions::new())
        .unwrap();

    for fold in output.metric_summary.folds() {
        assert!(fold.mae < 1e-3, "mae too large: {}", fold.mae);
        assert!(fold.rmse >= fold.mae - 1e-12);
        assert_eq!(fold.n_samples, 8 * 3);
    }
}

#[test]
fn test_results_and_eval_tables() {
    let (mut factory, x, y) = prepared(30);
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();
    let options = CrossValidateOptions::new()
        .with_return_results(true)
        .with_return_eval_df(true);

    let output = factory.cross_validate(&x, &y, &cv, options).unwrap();

    let results = output.results.as_ref().unwrap();
    assert_eq!(results.estimators.len(), 4);
    assert_eq!(results.train_indices.len(), 4);
    assert!(results.train_indices[0].len() < results.train_indices[3].len());
    assert!(results.fit_times.iter().all(|t| *t >= 0.0));

    // a fold's estimator can be handed back to predict
    let test_rows = x.take_rows(&results.test_indices[3]).unwrap();
    let preds = factory.predict(&test_rows, Some(&results.estimators[3])).unwrap();
    assert_eq!(preds.len(), 24);

    let eval = output.eval_frame().unwrap().unwrap();
    assert_eq!(eval.height(), 4 * 24);
    let folds: Vec<i64> = eval
        .column("fold")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(folds.first(), Some(&1));
    assert_eq!(folds.last(), Some(&4));

    let truth = eval.column("true").unwrap().f64().unwrap();
    let pred = eval.column("pred").unwrap().f64().unwrap();
    for (t, p) in truth.into_iter().zip(pred.into_iter()) {
        assert_abs_diff_eq!(t.unwrap(), p.unwrap(), epsilon = 1e-3);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let (mut factory, x, y) = prepared(36);
    let cv = TimeBasedSplit::new(5, 6, 3).unwrap();

    let sequential = factory
        .cross_validate(&x, &y, &cv, CrossValidateOptions::new())
        .unwrap();
    let parallel = factory
        .cross_validate(&x, &y, &cv, CrossValidateOptions::new().with_parallel(true))
        .unwrap();

    assert_eq!(sequential.metric_summary, parallel.metric_summary);
}

#[test]
fn test_insufficient_history_fails_before_fitting() {
    let (mut factory, x, y) = prepared(20);
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();

    let result = factory.cross_validate(
        &x,
        &y,
        &cv,
        CrossValidateOptions::new().with_return_results(true),
    );
    assert!(matches!(result, Err(ForecastError::ConfigError(_))));
    assert!(factory.results().is_none());
}

#[test]
fn test_fold_failure_aborts_run() {
    // a missing temperature in the first week lands in every training window
    let mut raw = raw_sales(30);
    let mut temperature: Vec<Option<f64>> = raw
        .column("Temperature")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    temperature[0] = None;
    raw.with_column(Series::new("Temperature".into(), temperature))
        .unwrap();

    let mut factory = SalesPredictionFactory::new("weekly_sales");
    let table = factory.preprocessing(&raw).unwrap();
    let (x, y) = factory.split_target(&table).unwrap();
    factory.initialize_pipeline(None, scaled_columns()).unwrap();
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();

    for parallel in [false, true] {
        let options = CrossValidateOptions::new()
            .with_return_results(true)
            .with_return_eval_df(true)
            .with_parallel(parallel);
        match factory.cross_validate(&x, &y, &cv, options) {
            Err(ForecastError::DataError(msg)) => assert!(msg.contains("temperature"), "{}", msg),
            other => panic!("expected a data error, got {:?}", other.map(|o| o.metric_summary)),
        }
        assert!(factory.results().is_none());
    }
}

#[test]
fn test_model_parameter_error_is_returned_unchanged() {
    let (mut factory, x, y) = prepared(30);
    let steps: Vec<(String, Step)> = vec![
        (
            "scaler".to_string(),
            ColumnTransformer::standard("numerical_scaler", scaled_columns()).into(),
        ),
        (
            "lasso".to_string(),
            RegressorKind::from(LassoRegression::new(-1.0)).into(),
        ),
    ];
    factory.initialize_pipeline(Some(steps), None).unwrap();
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();

    for parallel in [false, true] {
        let options = CrossValidateOptions::new()
            .with_return_results(true)
            .with_parallel(parallel);
        let result = factory.cross_validate(&x, &y, &cv, options);
        assert!(
            matches!(result, Err(ForecastError::InvalidParameter { ref name, .. }) if name == "alpha"),
            "parallel = {}",
            parallel
        );
        assert!(factory.results().is_none());
    }
    assert!(!factory.pipeline().unwrap().is_fitted());
}

#[test]
fn test_custom_pipeline_steps() {
    let (mut factory, x, y) = prepared(30);
    let steps: Vec<(String, Step)> = vec![
        (
            "scaler".to_string(),
            ColumnTransformer::standard("numerical_scaler", scaled_columns()).into(),
        ),
        (
            "ridge".to_string(),
            RegressorKind::from(RidgeRegression::new(10.0)).into(),
        ),
    ];
    factory.initialize_pipeline(Some(steps), None).unwrap();

    let cv = TimeBasedSplit::new(2, 8, 4).unwrap();
    let output = factory
        .cross_validate(&x, &y, &cv, CrossValidateOptions::new())
        .unwrap();

    assert_eq!(output.metric_summary.n_folds(), 2);
    assert_eq!(factory.pipeline().unwrap().model().model_type(), ModelType::Ridge);
    // shrinkage keeps the fit from being exact
    assert!(output.metric_summary.average("mae").unwrap() > 0.0);
}

#[test]
fn test_train_and_predict() {
    let (mut factory, x, y) = prepared(24);
    assert!(matches!(factory.predict(&x, None), Err(ForecastError::ModelNotFitted)));

    factory.train(&x, &y, "Weekly_Sales").unwrap();
    assert_eq!(factory.target(), "weekly_sales");
    let preds = factory.predict(&x, None).unwrap();
    for (p, t) in preds.iter().zip(y.iter()) {
        assert_abs_diff_eq!(*p, *t, epsilon = 1e-3);
    }
}
