//! Identify frontal zones from the horizontal gradient of equivalent potential temperature.
//!
//! A front is diagnosed wherever the 850 hPa equivalent potential temperature changes by more than
//! 4 K per 100 km. Equivalent potential temperature captures moisture contrasts as well as thermal
//! contrasts, so it picks out boundaries that the temperature alone misses.
//!
//! The detector is a pure function of its inputs. It performs no I/O and holds no state. Progress
//! is traced at `debug` level only, reporting the results is up to the caller using the returned
//! `FrontDiagnostics`.

use crate::{
    error::{AnalysisError, Result},
    field::{Field, Grid, LeveledField},
    gradient::gradient_magnitude,
    thermo::{check_pressure, dew_point_from_specific_humidity, equivalent_potential_temperature},
    units::Units,
};
use metfor::{HectoPascal, Quantity};
use ndarray::{Array3, ArrayView2, Axis};
use tracing::debug;

/// The isobaric level fronts are analyzed on.
pub const FRONT_LEVEL: HectoPascal = HectoPascal(850.0);

/// Gradient magnitude of equivalent potential temperature, in K/m, that marks a front. This is
/// 4 K per 100 km.
pub const FRONT_THRESHOLD_K_PER_M: f64 = 4.0e-5;

/// Name of the mask variable in the output archive.
pub const FRONT_MASK_NAME: &str = "front_mask";

/// A binary mask of frontal zones, 1 in a front and 0 elsewhere.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontMask {
    grid: Grid,
    level: HectoPascal,
    values: Array3<i32>,
}

impl FrontMask {
    /// Create a mask, checking the shape and that every value is 0 or 1.
    pub fn new(grid: Grid, level: HectoPascal, values: Array3<i32>) -> Result<Self> {
        if values.dim() != grid.shape() {
            return Err(AnalysisError::InvalidInput(format!(
                "mask has shape {:?} but its grid is {:?}",
                values.dim(),
                grid.shape()
            )));
        }

        if let Some(bad) = values.iter().find(|&&v| v != 0 && v != 1) {
            return Err(AnalysisError::InvalidInput(format!(
                "front mask values must be 0 or 1, found {}",
                bad
            )));
        }

        Ok(FrontMask {
            grid,
            level,
            values,
        })
    }

    /// Get the coordinates, the same as the fields the mask was derived from minus the level.
    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The pressure level this mask was derived on.
    #[inline]
    pub fn level(&self) -> HectoPascal {
        self.level
    }

    /// Get the mask values, indexed `(time, latitude, longitude)`.
    #[inline]
    pub fn values(&self) -> &Array3<i32> {
        &self.values
    }

    /// A view of a single time step, indexed `(latitude, longitude)`.
    #[inline]
    pub fn time_slice(&self, time_idx: usize) -> ArrayView2<i32> {
        self.values.index_axis(Axis(0), time_idx)
    }

    /// Number of frontal cells in each time step.
    pub fn front_cell_counts(&self) -> Vec<usize> {
        self.values
            .outer_iter()
            .map(|slab| slab.iter().filter(|&&v| v == 1).count())
            .collect()
    }
}

/// Summary of a front detection run, for the caller to report as it sees fit.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontDiagnostics {
    /// The level the analysis was done on.
    pub level: HectoPascal,
    /// The gradient threshold used, K/m.
    pub threshold: f64,
    /// Number of frontal cells in each time step.
    pub front_cells: Vec<usize>,
    /// Largest finite gradient magnitude in K/m, `None` if there were no finite values.
    pub max_gradient: Option<f64>,
    /// Cells where the equivalent potential temperature or its gradient was undefined, these are
    /// never marked as fronts.
    pub undefined_cells: usize,
    /// A surface pressure field was passed in and not used.
    pub surface_pressure_ignored: bool,
}

impl FrontDiagnostics {
    /// Total number of frontal cells over all time steps.
    pub fn total_front_cells(&self) -> usize {
        self.front_cells.iter().sum()
    }
}

/// The result of front identification.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontDetection {
    /// The binary mask.
    pub mask: FrontMask,
    /// Details about the run.
    pub diagnostics: FrontDiagnostics,
}

/// Identify frontal zones at 850 hPa from temperature and specific humidity.
///
/// Both fields must contain the 850 hPa level and share the same time, latitude, and longitude
/// coordinates. Temperature may be in Kelvin or Celsius, and humidity in kg/kg or g/kg.
///
/// The surface pressure field is accepted but not used yet.
///
/// # Errors
///
/// * `MissingLevel` if either field lacks 850 hPa.
/// * `GridMismatch` if the fields are on different grids.
/// * `UnitMismatch` if a field is in units that cannot be converted.
/// * `NotEnoughData` or `InvalidInput` if the grid can't be differentiated.
pub fn identify_fronts(
    temperature: &LeveledField,
    specific_humidity: &LeveledField,
    surface_pressure: Option<&Field>,
) -> Result<FrontDetection> {
    debug!(level = FRONT_LEVEL.unpack(), "extracting temperature and humidity");
    let t = temperature.select_level(FRONT_LEVEL)?;
    let q = specific_humidity.select_level(FRONT_LEVEL)?;

    t.grid().ensure_same_as(q.grid())?;

    let t = t.convert_to(Units::Kelvin)?;
    let q = q.convert_to(Units::KgPerKg)?;

    debug!("calculating equivalent potential temperature");
    let dew_point = dew_point_from_specific_humidity(FRONT_LEVEL, &q)?;
    let theta_e = equivalent_potential_temperature(FRONT_LEVEL, &t, &dew_point)?;

    let mut detection = front_mask_from_theta_e(&theta_e, FRONT_LEVEL)?;
    detection.diagnostics.surface_pressure_ignored = surface_pressure.is_some();

    Ok(detection)
}

/// Build the front mask from an equivalent potential temperature field.
///
/// The mask is 1 where the gradient magnitude is strictly greater than
/// `FRONT_THRESHOLD_K_PER_M` and 0 elsewhere, including cells where the gradient is undefined.
pub fn front_mask_from_theta_e(theta_e: &Field, level: HectoPascal) -> Result<FrontDetection> {
    check_pressure(level)?;

    if theta_e.units() != &Units::Kelvin {
        return Err(AnalysisError::UnitMismatch {
            expected: Units::Kelvin.to_string(),
            found: theta_e.units().to_string(),
        });
    }

    debug!("calculating gradients");
    let magnitude = gradient_magnitude(theta_e)?;

    debug!(
        threshold = FRONT_THRESHOLD_K_PER_M,
        "applying frontal threshold"
    );
    let values = magnitude
        .values()
        .mapv(|g| if g > FRONT_THRESHOLD_K_PER_M { 1 } else { 0 });

    let undefined_cells = magnitude
        .values()
        .iter()
        .zip(theta_e.values().iter())
        .filter(|(g, th)| !g.is_finite() || !th.is_finite())
        .count();

    let max_gradient = magnitude
        .values()
        .iter()
        .cloned()
        .filter(|g| g.is_finite())
        .fold(None, |acc: Option<f64>, g| match acc {
            Some(mx) if mx >= g => Some(mx),
            _ => Some(g),
        });

    let mask = FrontMask::new(theta_e.grid().clone(), level, values)?;

    let diagnostics = FrontDiagnostics {
        level,
        threshold: FRONT_THRESHOLD_K_PER_M,
        front_cells: mask.front_cell_counts(),
        max_gradient,
        undefined_cells,
        surface_pressure_ignored: false,
    };

    Ok(FrontDetection { mask, diagnostics })
}
