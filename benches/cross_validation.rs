use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sales_forecast::evaluation::{CrossValidateOptions, SalesPredictionFactory};
use sales_forecast::frame::IndexedFrame;
use sales_forecast::timeseries::{CrossValidator, TimeBasedSplit};
use polars::prelude::*;

fn create_sales_panel(n_stores: i64, n_weeks: i64) -> IndexedFrame {
    let n = (n_stores * n_weeks) as usize;
    let mut store = Vec::with_capacity(n);
    let mut year_week = Vec::with_capacity(n);
    let mut temperature = Vec::with_capacity(n);
    let mut fuel_price = Vec::with_capacity(n);
    let mut sales = Vec::with_capacity(n);

    for s in 1..=n_stores {
        for w in 0..n_weeks {
            let t = 50.0 + 25.0 * ((w + s) as f64 * 0.37).sin();
            let f = 2.5 + ((w * 7 + s * 3) % 11) as f64 * 0.05;
            store.push(s);
            // 52 weeks per year keeps keys increasing
            year_week.push(201000 + (w / 52) * 100 + w % 52 + 1);
            temperature.push(t);
            fuel_price.push(f);
            sales.push(10_000.0 * s as f64 + 120.0 * t - 800.0 * f);
        }
    }

    let df = df!(
        "store" => store,
        "year_week" => year_week,
        "temperature" => temperature,
        "fuel_price" => fuel_price,
        "weekly_sales" => sales
    )
    .unwrap();
    IndexedFrame::new(df, vec!["store".into(), "year_week".into()]).unwrap()
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_split");
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();

    for n_stores in [10, 45, 200].iter() {
        let table = create_sales_panel(*n_stores, 143);

        group.bench_with_input(BenchmarkId::new("split", n_stores), &table, |b, table| {
            b.iter(|| cv.split(black_box(table)).unwrap().count())
        });
    }

    group.finish();
}

fn bench_cross_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_validate");
    group.sample_size(10);
    let cv = TimeBasedSplit::new(4, 8, 4).unwrap();

    for n_stores in [10, 45].iter() {
        let mut factory = SalesPredictionFactory::new("weekly_sales");
        let table = create_sales_panel(*n_stores, 143);
        let (x, y) = factory.split_target(&table).unwrap();

        for parallel in [false, true] {
            let id = if parallel { "parallel" } else { "sequential" };
            let options = CrossValidateOptions::new().with_parallel(parallel);
            group.bench_with_input(BenchmarkId::new(id, n_stores), &x, |b, x| {
                b.iter(|| factory.cross_validate(black_box(x), &y, &cv, options).unwrap())
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_split, bench_cross_validate);
criterion_main!(benches);
