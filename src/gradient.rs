//! Horizontal gradients of gridded fields with respect to true distance on a spherical earth.
//!
//! The east-west grid spacing shrinks with the cosine of latitude, so the metric is computed for
//! every latitude row. Derivatives are second order accurate everywhere, allowing non-uniform
//! spacing: centered differences in the interior and three point one sided differences at the
//! edges of the grid. An axis with only two points falls back to a simple difference.

use crate::{
    error::{AnalysisError, Result},
    field::Field,
    units::Units,
};
use itertools::Itertools;
use metfor::{Meters, Quantity};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayViewMut1, Axis, Zip};

/// Mean radius of the earth.
pub const EARTH_RADIUS: Meters = Meters(6_371_008.7714);

/// The distances between neighboring grid points.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDeltas {
    /// East-west distance in meters between column `j` and `j + 1` along latitude row `i`, with
    /// shape `(n_lat, n_lon - 1)`.
    pub dx: Array2<f64>,
    /// North-south distance in meters between row `i` and `i + 1`, length `n_lat - 1`. This is
    /// signed, it is negative when latitudes run north to south.
    pub dy: Array1<f64>,
}

/// Calculate the distances between neighboring points of a latitude/longitude grid.
///
/// Coordinates are in degrees and must be strictly monotonic, with at least two points along each
/// axis. Longitude differences are wrapped into (-180, 180] so grids crossing the antimeridian
/// work.
///
/// # Examples
///
/// ```rust
/// use frontal_analysis::gradient::grid_deltas;
///
/// let deltas = grid_deltas(&[60.0, 0.0], &[10.0, 11.0]).unwrap();
///
/// // A degree of longitude at 60N is half as long as one at the equator.
/// let ratio = deltas.dx[[0, 0]] / deltas.dx[[1, 0]];
/// assert!((ratio - 0.5).abs() < 1.0e-12);
/// assert!(deltas.dy[0] < 0.0);
/// ```
pub fn grid_deltas(latitudes: &[f64], longitudes: &[f64]) -> Result<GridDeltas> {
    let lat_steps = coordinate_steps("latitude", latitudes, |a, b| b - a)?;
    let lon_steps = coordinate_steps("longitude", longitudes, |a, b| wrap_longitude(b - a))?;

    let radius = EARTH_RADIUS.unpack();

    let dy = lat_steps.mapv(|step| radius * step.to_radians());
    let dx = Array2::from_shape_fn((latitudes.len(), lon_steps.len()), |(i, j)| {
        radius * latitudes[i].to_radians().cos() * lon_steps[j].to_radians()
    });

    Ok(GridDeltas { dx, dy })
}

/// Calculate the horizontal gradient of a field, returning `(d/dx, d/dy)` in field units per
/// meter. Positive x is east, positive y is north.
///
/// Every time step is handled in one pass.
pub fn horizontal_gradient(field: &Field, deltas: &GridDeltas) -> Result<(Array3<f64>, Array3<f64>)> {
    let values = field.values();
    let (_, n_lat, n_lon) = values.dim();

    if n_lat < 2 || n_lon < 2 {
        return Err(AnalysisError::NotEnoughData);
    }

    if deltas.dx.dim() != (n_lat, n_lon.saturating_sub(1)) || deltas.dy.len() + 1 != n_lat {
        return Err(AnalysisError::InvalidInput(format!(
            "grid deltas do not match the {} x {} grid of '{}'",
            n_lat,
            n_lon,
            field.name()
        )));
    }

    let mut ddx = Array3::zeros(values.dim());
    let mut ddy = Array3::zeros(values.dim());

    // Along each latitude row, with the spacing for that row.
    Zip::indexed(ddx.lanes_mut(Axis(2)))
        .and(values.lanes(Axis(2)))
        .for_each(|(_, i), out, vals| first_derivative(vals, deltas.dx.row(i), out));

    // Along each longitude column.
    Zip::from(ddy.lanes_mut(Axis(1)))
        .and(values.lanes(Axis(1)))
        .for_each(|out, vals| first_derivative(vals, deltas.dy.view(), out));

    Ok((ddx, ddy))
}

/// Calculate the magnitude of the horizontal gradient of a field.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use frontal_analysis::{gradient::gradient_magnitude, Field, Grid, Units};
/// use ndarray::Array3;
///
/// let t0 = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let grid = Grid::new(vec![t0], vec![45.0, 44.75, 44.5], vec![25.0, 25.25, 25.5]);
/// let theta_e = Field::new("theta_e", Units::Kelvin, grid, Array3::from_elem((1, 3, 3), 320.0))
///     .unwrap();
///
/// let grad = gradient_magnitude(&theta_e).unwrap();
/// assert_eq!(grad.units(), &Units::KelvinPerMeter);
/// assert!(grad.values().iter().all(|&g| g == 0.0));
/// ```
pub fn gradient_magnitude(field: &Field) -> Result<Field> {
    let grid = field.grid();
    let deltas = grid_deltas(grid.latitudes(), grid.longitudes())?;
    let (ddx, ddy) = horizontal_gradient(field, &deltas)?;

    let magnitude = Zip::from(&ddx)
        .and(&ddy)
        .map_collect(|&gx, &gy| gx.hypot(gy));

    let units = match field.units() {
        Units::Kelvin => Units::KelvinPerMeter,
        other => Units::Other(format!("{} m**-1", other)),
    };

    Field::new(
        format!("{}_gradient_magnitude", field.name()),
        units,
        grid.clone(),
        magnitude,
    )
}

// Differences between neighboring coordinates, checking the axis is usable.
fn coordinate_steps<F>(axis: &str, coords: &[f64], step: F) -> Result<Array1<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    if coords.len() < 2 {
        return Err(AnalysisError::NotEnoughData);
    }

    let steps: Array1<f64> = coords
        .iter()
        .tuple_windows::<(_, _)>()
        .map(|(&a, &b)| step(a, b))
        .collect();

    let all_increasing = steps.iter().all(|&s| s > 0.0);
    let all_decreasing = steps.iter().all(|&s| s < 0.0);

    if all_increasing || all_decreasing {
        Ok(steps)
    } else {
        Err(AnalysisError::InvalidInput(format!(
            "{} coordinate is not strictly monotonic",
            axis
        )))
    }
}

fn wrap_longitude(delta: f64) -> f64 {
    let wrapped = (delta + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

// Derivative along one lane of a field given the spacings between its points.
fn first_derivative(vals: ArrayView1<f64>, spacing: ArrayView1<f64>, mut out: ArrayViewMut1<f64>) {
    let n = vals.len();
    debug_assert!(n >= 2);
    debug_assert_eq!(spacing.len() + 1, n);

    if n == 2 {
        let slope = (vals[1] - vals[0]) / spacing[0];
        out.fill(slope);
        return;
    }

    // Second order one sided differences at the edges.
    let (h0, h1) = (spacing[0], spacing[1]);
    out[0] = -(2.0 * h0 + h1) / (h0 * (h0 + h1)) * vals[0] + (h0 + h1) / (h0 * h1) * vals[1]
        - h0 / (h1 * (h0 + h1)) * vals[2];

    let (h0, h1) = (spacing[n - 3], spacing[n - 2]);
    out[n - 1] = h1 / (h0 * (h0 + h1)) * vals[n - 3] - (h0 + h1) / (h0 * h1) * vals[n - 2]
        + (2.0 * h1 + h0) / (h1 * (h0 + h1)) * vals[n - 1];

    for i in 1..(n - 1) {
        let (h1, h2) = (spacing[i - 1], spacing[i]);

        let a = -h2 / (h1 * (h1 + h2));
        let b = (h2 - h1) / (h1 * h2);
        let c = h1 / (h2 * (h1 + h2));

        out[i] = a * vals[i - 1] + b * vals[i] + c * vals[i + 1];
    }
}
