//! Run these benches with `cargo bench --bench fronts -- --verbose`

use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, Criterion};
use frontal_analysis::{
    gradient::gradient_magnitude, identify_fronts, Field, Grid, LeveledField, Units,
};
use metfor::HectoPascal;
use ndarray::{Array3, Array4};

fn build_tester() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(std::time::Duration::from_secs(10))
        .noise_threshold(0.03)
        .significance_level(0.01)
}

criterion_main!(front_benches);

criterion_group!(
    name = front_benches;
    config = build_tester();
    targets = identify_fronts_bench, gradient_magnitude_bench
);

// A day of hourly data on the default quarter degree domain, [35, 45] x [25, 45].
fn domain_grid() -> Grid {
    let start = NaiveDate::from_ymd_opt(2025, 10, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    let times = (0..24).map(|h| start + Duration::hours(h)).collect();
    let lats = (0..41).map(|j| 45.0 - 0.25 * j as f64).collect();
    let lons = (0..81).map(|i| 25.0 + 0.25 * i as f64).collect();

    Grid::new(times, lats, lons)
}

fn leveled<F>(grid: &Grid, name: &str, units: Units, f: F) -> LeveledField
where
    F: Fn(usize, usize, usize) -> f64,
{
    let (nt, ny, nx) = grid.shape();
    let levels = vec![HectoPascal(1000.0), HectoPascal(850.0), HectoPascal(700.0)];
    let values = Array4::from_shape_fn((nt, levels.len(), ny, nx), |(t, _, y, x)| f(t, y, x));

    LeveledField::new(name, units, levels, grid.clone(), values).unwrap()
}

fn identify_fronts_bench(c: &mut Criterion) {
    let grid = domain_grid();
    let t = leveled(&grid, "t", Units::Kelvin, |t, y, x| {
        285.0 + 8.0 * ((x as f64 - t as f64) / 10.0).tanh() - 0.1 * y as f64
    });
    let q = leveled(&grid, "q", Units::KgPerKg, |_, y, _| 0.004 + 0.00005 * y as f64);

    c.bench_function("identify_fronts", |b| {
        b.iter(|| identify_fronts(&t, &q, None).expect("oops"));
    });
}

fn gradient_magnitude_bench(c: &mut Criterion) {
    let grid = domain_grid();
    let values = Array3::from_shape_fn(grid.shape(), |(t, y, x)| {
        320.0 + ((x + y + t) as f64 / 7.0).sin()
    });
    let theta_e = Field::new("theta_e", Units::Kelvin, grid, values).unwrap();

    c.bench_function("gradient_magnitude", |b| {
        b.iter(|| gradient_magnitude(&theta_e).expect("oops"));
    });
}
