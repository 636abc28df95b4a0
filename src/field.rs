//! Data types for gridded fields.
//!
//! A `Field` is a single-level variable indexed by `(time, latitude, longitude)`. A `LeveledField`
//! adds an isobaric vertical coordinate and is indexed by `(time, level, latitude, longitude)`,
//! which is how variables come out of the reanalysis archives. Missing values are stored as NaN.

use crate::{
    error::{AnalysisError, Result},
    units::{converter, Units},
};
use metfor::{HectoPascal, Quantity};
use ndarray::{Array3, Array4, ArrayView2, Axis};

pub use self::grid::Grid;

/// Tolerance used when matching a requested pressure level against the level coordinate.
const LEVEL_TOLERANCE_HPA: f64 = 1.0e-6;

/// A gridded scalar field with explicit units.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    units: Units,
    grid: Grid,
    values: Array3<f64>,
}

impl Field {
    /// Create a new field, checking that the array shape matches the grid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use frontal_analysis::{Field, Grid, Units};
    /// use ndarray::Array3;
    ///
    /// let t0 = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// let grid = Grid::new(vec![t0], vec![45.0, 44.75], vec![25.0, 25.25]);
    ///
    /// let field = Field::new("t", Units::Kelvin, grid.clone(), Array3::from_elem((1, 2, 2), 290.0));
    /// assert!(field.is_ok());
    ///
    /// let field = Field::new("t", Units::Kelvin, grid, Array3::from_elem((1, 3, 2), 290.0));
    /// assert!(field.is_err());
    /// ```
    pub fn new<S>(name: S, units: Units, grid: Grid, values: Array3<f64>) -> Result<Self>
    where
        S: Into<String>,
    {
        let name = name.into();
        let (nt, ny, nx) = grid.shape();

        if values.dim() != (nt, ny, nx) {
            return Err(AnalysisError::InvalidInput(format!(
                "array for '{}' has shape {:?} but its grid is {:?}",
                name,
                values.dim(),
                (nt, ny, nx)
            )));
        }

        Ok(Field {
            name,
            units,
            grid,
            values,
        })
    }

    /// Get the variable name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builder method to rename a field.
    #[inline]
    pub fn with_name<S: Into<String>>(self, name: S) -> Self {
        Field {
            name: name.into(),
            ..self
        }
    }

    /// Get the units of the values.
    #[inline]
    pub fn units(&self) -> &Units {
        &self.units
    }

    /// Get the coordinates.
    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Get the values, indexed `(time, latitude, longitude)`.
    #[inline]
    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    /// Take ownership of the values.
    #[inline]
    pub fn into_values(self) -> Array3<f64> {
        self.values
    }

    /// A view of a single time step, indexed `(latitude, longitude)`.
    #[inline]
    pub fn time_slice(&self, time_idx: usize) -> ArrayView2<f64> {
        self.values.index_axis(Axis(0), time_idx)
    }

    /// Make a copy of this field in different units.
    ///
    /// Fails with `UnitMismatch` if there is no conversion between the two units.
    pub fn convert_to(&self, units: Units) -> Result<Field> {
        let conversion = converter(&self.units, &units)?;

        Ok(Field {
            name: self.name.clone(),
            units,
            grid: self.grid.clone(),
            values: self.values.mapv(conversion),
        })
    }
}

/// A gridded field with an isobaric vertical coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct LeveledField {
    name: String,
    units: Units,
    levels: Vec<HectoPascal>,
    grid: Grid,
    values: Array4<f64>,
}

impl LeveledField {
    /// Create a new field, checking that the array shape matches the levels and grid.
    pub fn new<S>(
        name: S,
        units: Units,
        levels: Vec<HectoPascal>,
        grid: Grid,
        values: Array4<f64>,
    ) -> Result<Self>
    where
        S: Into<String>,
    {
        let name = name.into();
        let (nt, ny, nx) = grid.shape();
        let expected = (nt, levels.len(), ny, nx);

        if values.dim() != expected {
            return Err(AnalysisError::InvalidInput(format!(
                "array for '{}' has shape {:?} but its coordinates are {:?}",
                name,
                values.dim(),
                expected
            )));
        }

        Ok(LeveledField {
            name,
            units,
            levels,
            grid,
            values,
        })
    }

    /// Get the variable name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the units of the values.
    #[inline]
    pub fn units(&self) -> &Units {
        &self.units
    }

    /// Get the pressure levels.
    #[inline]
    pub fn levels(&self) -> &[HectoPascal] {
        &self.levels
    }

    /// Get the horizontal and time coordinates.
    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Get the values, indexed `(time, level, latitude, longitude)`.
    #[inline]
    pub fn values(&self) -> &Array4<f64> {
        &self.values
    }

    /// Find the index of a pressure level in the vertical coordinate.
    pub fn level_index(&self, level: HectoPascal) -> Option<usize> {
        self.levels
            .iter()
            .position(|lvl| (*lvl - level).unpack().abs() < LEVEL_TOLERANCE_HPA)
    }

    /// Select the horizontal slab at a pressure level for every time step.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use frontal_analysis::{AnalysisError, Grid, LeveledField, Units};
    /// use metfor::HectoPascal;
    /// use ndarray::Array4;
    ///
    /// let t0 = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// let grid = Grid::new(vec![t0], vec![45.0, 44.75], vec![25.0, 25.25]);
    /// let levels = vec![HectoPascal(850.0), HectoPascal(700.0)];
    /// let t = LeveledField::new("t", Units::Kelvin, levels, grid, Array4::zeros((1, 2, 2, 2)))
    ///     .unwrap();
    ///
    /// assert_eq!(t.select_level(HectoPascal(700.0)).unwrap().values().dim(), (1, 2, 2));
    ///
    /// match t.select_level(HectoPascal(500.0)) {
    ///     Err(AnalysisError::MissingLevel { variable, .. }) => assert_eq!(variable, "t"),
    ///     _ => panic!("500 hPa is not in this field"),
    /// }
    /// ```
    pub fn select_level(&self, level: HectoPascal) -> Result<Field> {
        let idx = self
            .level_index(level)
            .ok_or_else(|| AnalysisError::MissingLevel {
                variable: self.name.clone(),
                level,
            })?;

        Ok(Field {
            name: self.name.clone(),
            units: self.units.clone(),
            grid: self.grid.clone(),
            values: self.values.index_axis(Axis(1), idx).to_owned(),
        })
    }
}

mod grid;
