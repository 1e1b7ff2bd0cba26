use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use heatpump_counter::{
    forecast, threshold_table, trailing_mean, ForecastSettings, TemperaturePoint,
    TemperatureSeries, TemperatureUnit, ThresholdRange, TrendMode,
};

/// About fourteen years of synthetic daily minimums.
fn series() -> TemperatureSeries {
    let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
    let points = (0..5000)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / 365.25;
            let noise = ((i * 7919) % 17) as f64 - 8.0;
            TemperaturePoint::new(start + Duration::days(i), 35.0 - 25.0 * angle.cos() + noise)
        })
        .collect();
    TemperatureSeries::new(TemperatureUnit::Fahrenheit, points)
}

fn bench_aggregate(c: &mut Criterion) {
    let series = series();
    let values: Vec<f64> = series.values().collect();
    let range = ThresholdRange::new(-25, 60).unwrap();
    let settings = ForecastSettings::new(TrendMode::Linear, 5).unwrap();

    c.bench_function("threshold_table", |b| {
        b.iter(|| threshold_table(black_box(&series), black_box(range)))
    });
    c.bench_function("trailing_mean_30", |b| {
        b.iter(|| trailing_mean(black_box(&values), 30))
    });
    c.bench_function("forecast_5y", |b| {
        b.iter(|| forecast(black_box(&series), settings))
    });
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
