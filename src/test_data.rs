//! Synthetic grids used in tests.

use crate::{
    field::{Field, Grid, LeveledField},
    units::Units,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use metfor::HectoPascal;
use ndarray::{Array3, Array4};

/// Latitudes of the default test grid, north to south like the reanalysis files.
pub const TEST_LATS: [f64; 3] = [45.0, 44.75, 44.5];
/// Longitudes of the default test grid.
pub const TEST_LONS: [f64; 3] = [25.0, 25.25, 25.5];

/// The first valid time of every test grid.
pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

/// `n` hourly valid times.
pub fn hours_from_start(n: usize) -> Vec<NaiveDateTime> {
    (0..n)
        .map(|h| start_time() + Duration::hours(h as i64))
        .collect()
}

/// The default 3x3 test grid with `n_times` hourly time steps.
pub fn test_grid(n_times: usize) -> Grid {
    Grid::new(hours_from_start(n_times), TEST_LATS.to_vec(), TEST_LONS.to_vec())
}

/// Build a single level field on `grid` from a function of `(time, lat, lon)` indexes.
pub fn field_on<F>(grid: &Grid, name: &str, units: Units, f: F) -> Field
where
    F: Fn(usize, usize, usize) -> f64,
{
    let values = Array3::from_shape_fn(grid.shape(), |(t, y, x)| f(t, y, x));
    Field::new(name, units, grid.clone(), values).unwrap()
}

/// Build a leveled field on the default test grid from a function of
/// `(time, level, lat, lon)` indexes.
pub fn leveled_field<F>(
    name: &str,
    units: Units,
    levels: &[f64],
    n_times: usize,
    f: F,
) -> LeveledField
where
    F: Fn(usize, usize, usize, usize) -> f64,
{
    let grid = test_grid(n_times);
    let (nt, ny, nx) = grid.shape();
    let values = Array4::from_shape_fn((nt, levels.len(), ny, nx), |(t, l, y, x)| f(t, l, y, x));
    let levels = levels.iter().cloned().map(HectoPascal).collect();

    LeveledField::new(name, units, levels, grid, values).unwrap()
}
