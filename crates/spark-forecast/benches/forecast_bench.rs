use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spark_core::{ForecastConfig, TimeSeriesPoint};

fn history(len: usize) -> Vec<TimeSeriesPoint> {
    (0..len)
        .map(|i| {
            let wobble = ((i * 37) % 11) as f64 * 180.0;
            TimeSeriesPoint::new(2000 + i as i32, 50_000.0 + 3_900.0 * i as f64 + wobble)
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let cfg = ForecastConfig::default();
    let short = history(6);
    let long = history(25);
    c.bench_function("forecast 6y history x 6", |b| {
        b.iter(|| {
            let _ = black_box(spark_forecast::fit(&short, 6, &cfg));
        })
    });
    c.bench_function("forecast 25y history x 10", |b| {
        b.iter(|| {
            let _ = black_box(spark_forecast::fit(&long, 10, &cfg));
        })
    });
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
