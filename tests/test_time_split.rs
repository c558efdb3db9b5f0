//! Integration test: walk-forward time-based splitting

use chrono::{Duration, NaiveDate};
use sales_forecast::error::ForecastError;
use sales_forecast::frame::IndexedFrame;
use sales_forecast::preprocessing::year_week;
use sales_forecast::timeseries::{CrossValidator, Fold, TimeBasedSplit};
use polars::prelude::*;

/// Sorted weekly period keys starting on a Friday late in 2010.
fn weeks(n: usize) -> Vec<i64> {
    let start = NaiveDate::from_ymd_opt(2010, 11, 5).unwrap();
    (0..n)
        .map(|w| year_week(start + Duration::weeks(w as i64)))
        .collect()
}

/// `stores` entities observed in every one of `n_weeks` periods.
fn panel(n_weeks: usize, stores: i64) -> IndexedFrame {
    let periods = weeks(n_weeks);
    let mut store = Vec::new();
    let mut year_week = Vec::new();
    let mut sales = Vec::new();
    for s in 1..=stores {
        for (w, &period) in periods.iter().enumerate() {
            store.push(s);
            year_week.push(period);
            sales.push(1000.0 * s as f64 + w as f64);
        }
    }
    let df = df!(
        "store" => store,
        "year_week" => year_week,
        "weekly_sales" => sales
    )
    .unwrap();
    IndexedFrame::new(df, vec!["store".into(), "year_week".into()]).unwrap()
}

fn folds(cv: &TimeBasedSplit, table: &IndexedFrame) -> Vec<Fold> {
    cv.split(table).unwrap().collect()
}

#[test]
fn test_reference_windows_24_weeks() {
    let table = panel(24, 3);
    let periods = weeks(24);
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();
    let folds = folds(&cv, &table);

    assert_eq!(folds.len(), 4);

    assert_eq!(folds[0].test_start, 4);
    assert_eq!(folds[0].train_periods, periods[0..4].to_vec());
    assert_eq!(folds[0].test_periods, periods[4..12].to_vec());

    assert_eq!(folds[3].test_start, 16);
    assert_eq!(folds[3].train_periods, periods[0..16].to_vec());
    assert_eq!(folds[3].test_periods, periods[16..24].to_vec());

    // every store contributes one row per period
    assert_eq!(folds[0].train_indices.len(), 4 * 3);
    assert_eq!(folds[0].test_indices.len(), 8 * 3);
}

#[test]
fn test_window_crosses_year_boundary() {
    let periods = weeks(24);
    assert!(periods.windows(2).all(|w| w[0] < w[1]), "keys must be increasing: {:?}", periods);
    assert!(periods.iter().any(|&p| p / 100 == 2011));
}

#[test]
fn test_exactly_min_required_periods_is_rejected() {
    let table = panel(20, 2);
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();
    assert_eq!(cv.min_required_size().unwrap(), 20);

    let result = cv.split(&table);
    assert!(matches!(result, Err(ForecastError::ConfigError(_))));

    // one more period leaves a single training period for the first fold
    let table = panel(21, 2);
    let folds = folds(&cv, &table);
    assert_eq!(folds[0].train_periods.len(), 1);
}

#[test]
fn test_fold_properties_hold_across_configurations() {
    let table = panel(40, 2);
    let periods = weeks(40);

    for (n_splits, test_size, step_size) in [(1, 1, 1), (3, 5, 2), (4, 8, 4), (5, 3, 6), (2, 10, 1)] {
        let cv = TimeBasedSplit::new(n_splits, test_size, step_size).unwrap();
        let folds = folds(&cv, &table);
        assert_eq!(folds.len(), n_splits);
        assert_eq!(cv.get_n_splits(), n_splits);

        for (i, fold) in folds.iter().enumerate() {
            assert_eq!(fold.fold, i);
            assert_eq!(fold.test_periods.len(), test_size);

            let max_train = fold.train_periods.iter().max().unwrap();
            let min_test = fold.test_periods.iter().min().unwrap();
            assert!(max_train < min_test);

            // training always starts at the first observed period
            assert_eq!(fold.train_periods[0], periods[0]);
        }

        for pair in folds.windows(2) {
            assert_eq!(pair[1].test_start - pair[0].test_start, step_size);
        }

        // the last window ends at the final period
        let last = folds.last().unwrap();
        assert_eq!(last.test_periods.last(), periods.last());
    }
}

#[test]
fn test_row_positions_follow_period_values() {
    // rows deliberately out of time order
    let df = df!(
        "store" => &[1i64, 1, 1, 1, 1, 1],
        "year_week" => &[201006i64, 201001, 201004, 201002, 201005, 201003],
        "weekly_sales" => &[6.0, 1.0, 4.0, 2.0, 5.0, 3.0]
    )
    .unwrap();
    let table = IndexedFrame::new(df, vec!["store".into(), "year_week".into()]).unwrap();

    let cv = TimeBasedSplit::new(2, 2, 1).unwrap();
    let folds = folds(&cv, &table);

    assert_eq!(folds[0].train_periods, vec![201001, 201002, 201003]);
    assert_eq!(folds[0].train_indices, vec![1, 3, 5]);
    assert_eq!(folds[0].test_indices, vec![2, 4]);
    assert_eq!(folds[1].test_periods, vec![201005, 201006]);
    assert_eq!(folds[1].test_indices, vec![0, 4]);
}

#[test]
fn test_custom_time_index_name() {
    let df = df!(
        "store" => &[1i64, 1, 1, 1],
        "week" => &[1i64, 2, 3, 4],
        "weekly_sales" => &[1.0, 2.0, 3.0, 4.0]
    )
    .unwrap();
    let table = IndexedFrame::new(df, vec!["store".into(), "week".into()]).unwrap();

    let default_cv = TimeBasedSplit::new(1, 2, 1).unwrap();
    assert!(matches!(default_cv.split(&table), Err(ForecastError::ConfigError(_))));

    let cv = TimeBasedSplit::new(1, 2, 1).unwrap().with_time_index_name("week");
    let folds = folds(&cv, &table);
    assert_eq!(folds[0].train_periods, vec![1, 2]);
    assert_eq!(folds[0].test_periods, vec![3, 4]);
}

#[test]
fn test_split_is_restartable() {
    let table = panel(30, 2);
    let cv = TimeBasedSplit::new(3, 6, 3).unwrap();

    let first = folds(&cv, &table);
    let second = folds(&cv, &table);
    assert_eq!(first, second);

    let lazy = cv.split(&table).unwrap();
    assert_eq!(lazy.len(), 3);
    assert_eq!(lazy.time_range().len(), 30);
}

#[test]
fn test_non_positive_parameters_rejected() {
    assert!(matches!(TimeBasedSplit::new(0, 8, 4), Err(ForecastError::ConfigError(_))));
    assert!(matches!(TimeBasedSplit::new(4, 0, 4), Err(ForecastError::ConfigError(_))));
    assert!(matches!(TimeBasedSplit::new(4, 8, 0), Err(ForecastError::ConfigError(_))));
}

#[test]
fn test_window_too_large_to_count_is_rejected() {
    let table = panel(4, 2);
    let cv = TimeBasedSplit::new(usize::MAX / 2 + 2, 1, 2).unwrap();
    assert!(matches!(cv.min_required_size(), Err(ForecastError::ConfigError(_))));
    assert!(matches!(cv.split(&table), Err(ForecastError::ConfigError(_))));
}
