//! Unit tags for gridded fields and the explicit conversions between them.
//!
//! Scalars use the `metfor` quantity types. Whole arrays carry a `Units` tag instead, since the
//! units of a field read from an archive are only known at run time.
use crate::error::{AnalysisError, Result};
use metfor::{Celsius, Kelvin, Quantity};
use std::{fmt, str::FromStr};

/// The units a field is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Units {
    /// Kelvin
    Kelvin,
    /// Degrees Celsius
    Celsius,
    /// Mass of water vapor per mass of moist air.
    KgPerKg,
    /// Grams of water vapor per kilogram of moist air.
    GramsPerKg,
    /// Wind components.
    MetersPerSecond,
    /// Pressure in Pa
    Pascal,
    /// Pressure in hPa
    HectoPascal,
    /// Spatial temperature gradient.
    KelvinPerMeter,
    /// Pure numbers, masks and flags.
    Dimensionless,
    /// Anything else, kept verbatim.
    Other(String),
}

impl Units {
    /// The symbol written to archive `units` attributes.
    pub fn symbol(&self) -> &str {
        match self {
            Units::Kelvin => "K",
            Units::Celsius => "degC",
            Units::KgPerKg => "kg kg**-1",
            Units::GramsPerKg => "g kg**-1",
            Units::MetersPerSecond => "m s**-1",
            Units::Pascal => "Pa",
            Units::HectoPascal => "hPa",
            Units::KelvinPerMeter => "K m**-1",
            Units::Dimensionless => "1",
            Units::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Units {
    type Err = std::convert::Infallible;

    /// Parse a units attribute. Unrecognized strings become `Units::Other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use frontal_analysis::Units;
    ///
    /// assert_eq!("K".parse::<Units>().unwrap(), Units::Kelvin);
    /// assert_eq!("kg kg**-1".parse::<Units>().unwrap(), Units::KgPerKg);
    /// assert_eq!("furlongs".parse::<Units>().unwrap(), Units::Other("furlongs".to_owned()));
    /// ```
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let units = match s.trim() {
            "K" | "kelvin" | "Kelvin" | "degK" => Units::Kelvin,
            "degC" | "C" | "celsius" | "Celsius" | "degree_Celsius" | "°C" => Units::Celsius,
            "kg kg**-1" | "kg/kg" | "kg kg-1" | "1 kg kg**-1" => Units::KgPerKg,
            "g kg**-1" | "g/kg" | "g kg-1" => Units::GramsPerKg,
            "m s**-1" | "m/s" | "m s-1" => Units::MetersPerSecond,
            "Pa" | "pascal" => Units::Pascal,
            "hPa" | "millibar" | "mb" | "hectopascal" => Units::HectoPascal,
            "K m**-1" | "K/m" | "K m-1" => Units::KelvinPerMeter,
            "1" | "" | "dimensionless" => Units::Dimensionless,
            other => Units::Other(other.to_owned()),
        };

        Ok(units)
    }
}

/// Get a function that converts values from one unit to another.
///
/// Only kelvin/celsius, Pa/hPa, and g/kg to kg/kg conversions are supported. Converting a unit to
/// itself gives the identity.
pub fn converter(from: &Units, to: &Units) -> Result<fn(f64) -> f64> {
    fn identity(v: f64) -> f64 {
        v
    }

    fn k_to_c(v: f64) -> f64 {
        Celsius::from(Kelvin(v)).unpack()
    }

    fn c_to_k(v: f64) -> f64 {
        Kelvin::from(Celsius(v)).unpack()
    }

    fn pa_to_hpa(v: f64) -> f64 {
        v / 100.0
    }

    fn hpa_to_pa(v: f64) -> f64 {
        v * 100.0
    }

    fn g_to_kg(v: f64) -> f64 {
        v / 1000.0
    }

    let conversion: fn(f64) -> f64 = match (from, to) {
        (a, b) if a == b => identity,
        (Units::Kelvin, Units::Celsius) => k_to_c,
        (Units::Celsius, Units::Kelvin) => c_to_k,
        (Units::Pascal, Units::HectoPascal) => pa_to_hpa,
        (Units::HectoPascal, Units::Pascal) => hpa_to_pa,
        (Units::GramsPerKg, Units::KgPerKg) => g_to_kg,
        _ => {
            return Err(AnalysisError::UnitMismatch {
                expected: to.to_string(),
                found: from.to_string(),
            })
        }
    };

    Ok(conversion)
}
