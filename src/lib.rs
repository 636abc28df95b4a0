#![warn(missing_docs)]
//! Functions and data types for finding frontal zones in gridded reanalysis data.
//!
//! Fronts are diagnosed from the horizontal gradient of equivalent potential temperature at
//! 850 hPa. The core detector, `identify_fronts`, is a pure function of temperature and specific
//! humidity fields. Around it are the stages needed to run it on ERA5 downloads: subsetting and
//! merging the raw files, reading and writing archives, and planning map overlays.
//!
//! # Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use frontal_analysis::{identify_fronts, Grid, LeveledField, Units};
//! use metfor::HectoPascal;
//! use ndarray::Array4;
//!
//! let t0 = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let grid = Grid::new(vec![t0], vec![45.0, 44.75, 44.5], vec![25.0, 25.25, 25.5]);
//! let levels = vec![HectoPascal(850.0)];
//!
//! let t = LeveledField::new(
//!     "t",
//!     Units::Kelvin,
//!     levels.clone(),
//!     grid.clone(),
//!     Array4::from_elem((1, 1, 3, 3), 290.0),
//! )
//! .unwrap();
//! let q = LeveledField::new("q", Units::KgPerKg, levels, grid, Array4::from_elem((1, 1, 3, 3), 0.005))
//!     .unwrap();
//!
//! let detection = identify_fronts(&t, &q, None).unwrap();
//! assert_eq!(detection.diagnostics.total_front_cells(), 0);
//! ```

//
// API
//
pub use crate::{
    error::{AnalysisError, Result},
    field::{Field, Grid, LeveledField},
    fronts::{
        front_mask_from_theta_e, identify_fronts, FrontDetection, FrontDiagnostics, FrontMask,
        FRONT_LEVEL, FRONT_MASK_NAME, FRONT_THRESHOLD_K_PER_M,
    },
    units::Units,
};

pub mod archive;
pub mod cf_time;
pub mod gradient;
pub mod pipeline;
pub mod plot;
pub mod preprocess;
pub mod thermo;

//
// Internal use only
//

// Modules
mod error;
mod field;
mod fronts;
#[cfg(test)]
mod test_data;
mod units;
