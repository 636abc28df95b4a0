//! Error types for the frontal-analysis crate.
use metfor::{HectoPascal, Quantity};
use std::path::PathBuf;

/// Error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The requested pressure level is not in the vertical coordinate of a field.
    #[error("Pressure level {} hPa not found for variable '{}'.", .level.unpack(), .variable)]
    MissingLevel {
        /// Name of the variable that lacked the level.
        variable: String,
        /// The level that was requested.
        level: HectoPascal,
    },
    /// Two fields that must share coordinates do not.
    #[error("Fields are not on the same grid: {0}")]
    GridMismatch(String),
    /// A field is not in the units required and cannot be converted.
    #[error("Expected units of {expected}, found {found}.")]
    UnitMismatch {
        /// The units required.
        expected: String,
        /// The units the field carried.
        found: String,
    },
    /// Not enough data available for analysis.
    #[error("Not enough data available for analysis.")]
    NotEnoughData,
    /// Bad or invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A named variable is not in an archive.
    #[error("Variable '{0}' not found in archive.")]
    MissingVariable(String),
    /// An archive was expected on disk (or in a store) but is not there.
    #[error("Archive not found: {}", .0.display())]
    MissingFile(PathBuf),
    /// A time coordinate or time range could not be interpreted.
    #[error("Bad time value: {0}")]
    Time(String),
    /// Forward an error from the standard library I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Forward an error from the netcdf crate.
    #[cfg(feature = "netcdf")]
    #[error("Error bubbled up from netcdf crate: {0}")]
    NetCdf(#[from] netcdf::Error),
}

/// Shorthand for results.
pub type Result<T> = ::std::result::Result<T, AnalysisError>;
