#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use frontal_analysis::{Field, Grid, LeveledField, Units};
use metfor::HectoPascal;
use ndarray::{Array3, Array4};

/// `n` hourly times starting at 2025-10-01 00Z.
pub fn hourly_times(n: usize) -> Vec<NaiveDateTime> {
    let start = NaiveDate::from_ymd_opt(2025, 10, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();

    (0..n).map(|h| start + Duration::hours(h as i64)).collect()
}

/// A regular grid with `n_lat` x `n_lon` points spaced `step` degrees apart, starting at the
/// north west corner.
pub fn regular_grid(
    n_times: usize,
    north: f64,
    west: f64,
    step: f64,
    n_lat: usize,
    n_lon: usize,
) -> Grid {
    let lats = (0..n_lat).map(|j| north - step * j as f64).collect();
    let lons = (0..n_lon).map(|i| west + step * i as f64).collect();

    Grid::new(hourly_times(n_times), lats, lons)
}

/// The 3x3, quarter degree grid of the warm corner scenario.
pub fn corner_grid(n_times: usize) -> Grid {
    regular_grid(n_times, 45.0, 25.0, 0.25, 3, 3)
}

/// A single level field from a function of `(time, lat, lon)` indexes.
pub fn field<F>(grid: &Grid, name: &str, units: Units, f: F) -> Field
where
    F: Fn(usize, usize, usize) -> f64,
{
    let values = Array3::from_shape_fn(grid.shape(), |(t, y, x)| f(t, y, x));
    Field::new(name, units, grid.clone(), values).unwrap()
}

/// A field on the given pressure levels, the same at every level.
pub fn leveled<F>(grid: &Grid, name: &str, units: Units, levels: &[f64], f: F) -> LeveledField
where
    F: Fn(usize, usize, usize) -> f64,
{
    let (nt, ny, nx) = grid.shape();
    let values = Array4::from_shape_fn((nt, levels.len(), ny, nx), |(t, _, y, x)| f(t, y, x));
    let levels = levels.iter().cloned().map(HectoPascal).collect();

    LeveledField::new(name, units, levels, grid.clone(), values).unwrap()
}

/// Temperature with a warm cell in the north west corner, 310 K there and 290 K elsewhere.
pub fn warm_corner_temperature(grid: &Grid, levels: &[f64]) -> LeveledField {
    leveled(grid, "t", Units::Kelvin, levels, |_, y, x| {
        if y == 0 && x == 0 {
            310.0
        } else {
            290.0
        }
    })
}

/// Specific humidity of 5 g/kg everywhere.
pub fn uniform_humidity(grid: &Grid, levels: &[f64]) -> LeveledField {
    leveled(grid, "q", Units::KgPerKg, levels, |_, _, _| 0.005)
}
