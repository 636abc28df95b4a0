//! Thermodynamic fields derived from temperature and moisture on an isobaric surface.
//!
//! Vapor pressure and mixing ratio come from `metfor`, equivalent potential temperature uses
//! Bolton (1980). These functions apply the point formulas across whole grids. Cells where a
//! formula has no defined value, e.g. zero or negative humidity or a missing input, are set to NaN
//! rather than failing the whole field.

use crate::{
    error::{AnalysisError, Result},
    field::Field,
    units::Units,
};
use metfor::{Celsius, HectoPascal, Kelvin, Quantity};
use ndarray::Zip;

/// Calculate the dew point from specific humidity on an isobaric surface.
///
/// The specific humidity is converted to a mixing ratio `w`, the vapor pressure is then
/// `e = p w / (epsilon + w)` and is inverted to get the dew point. Humidity in g/kg is converted to
/// kg/kg first. The result is in Celsius.
pub fn dew_point_from_specific_humidity(pressure: HectoPascal, humidity: &Field) -> Result<Field> {
    let humidity = humidity.convert_to(Units::KgPerKg)?;

    let values = humidity.values().mapv(|q| {
        // Missing or unphysical moisture, leave a hole in the field.
        if !(q > 0.0 && q < 1.0) {
            return std::f64::NAN;
        }

        let mw = metfor::mixing_ratio_from_specific_humidity(q);
        metfor::dew_point_from_p_and_mw(pressure, mw)
            .map(|dp| dp.unpack())
            .filter(|dp| dp.is_finite())
            .unwrap_or(std::f64::NAN)
    });

    Field::new("dew_point", Units::Celsius, humidity.grid().clone(), values)
}

/// Calculate the equivalent potential temperature on an isobaric surface.
///
/// Uses equation 39 of Bolton (1980), "The Computation of Equivalent Potential Temperature",
/// Monthly Weather Review 108, with the temperature at the lifting condensation level from his
/// equation 15.
///
/// `temperature` and `dew_point` may be in Kelvin or Celsius and must share a grid. The result is
/// in Kelvin.
pub fn equivalent_potential_temperature(
    pressure: HectoPascal,
    temperature: &Field,
    dew_point: &Field,
) -> Result<Field> {
    temperature.grid().ensure_same_as(dew_point.grid())?;

    let temperature = temperature.convert_to(Units::Kelvin)?;
    let dew_point = dew_point.convert_to(Units::Kelvin)?;

    let values = Zip::from(temperature.values())
        .and(dew_point.values())
        .map_collect(|&t, &dp| {
            if !t.is_finite() || !dp.is_finite() {
                return std::f64::NAN;
            }

            bolton_theta_e(Kelvin(t), Kelvin(dp), pressure).unwrap_or(std::f64::NAN)
        });

    Field::new("theta_e", Units::Kelvin, temperature.grid().clone(), values)
}

fn bolton_theta_e(temperature: Kelvin, dew_point: Kelvin, pressure: HectoPascal) -> Option<f64> {
    let (t, td, p) = (temperature.unpack(), dew_point.unpack(), pressure.unpack());

    let e = metfor::vapor_pressure_water(Celsius::from(dew_point))?.unpack();
    if e >= p {
        return None;
    }
    let r = metfor::epsilon * e / (p - e);

    let t_lcl = 56.0 + 1.0 / (1.0 / (td - 56.0) + (t / td).ln() / 800.0);
    let kappa = metfor::Rd / metfor::cpd;
    let theta_dl = t * (1000.0 / (p - e)).powf(kappa) * (t / t_lcl).powf(0.28 * r);
    let theta_e = theta_dl * (r * (1.0 + 0.448 * r) * (3036.0 / t_lcl - 1.78)).exp();

    Some(theta_e).filter(|v| v.is_finite())
}

/// Check a pressure level is physically sensible before using it in the formulas.
pub(crate) fn check_pressure(pressure: HectoPascal) -> Result<()> {
    let p = pressure.unpack();
    if p.is_finite() && p > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidInput(format!(
            "pressure level must be positive, got {} hPa",
            p
        )))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::{field_on, test_grid};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_dew_point_from_specific_humidity() {
        let grid = test_grid(1);
        let q = field_on(&grid, "q", Units::KgPerKg, |_, _, _| 0.005);

        let dp = dew_point_from_specific_humidity(HectoPascal(850.0), &q).unwrap();
        assert_eq!(dp.units(), &Units::Celsius);

        // 5 g/kg at 850 hPa is a vapor pressure near 6.8 hPa, or a dew point near 1.5C.
        for &v in dp.values() {
            assert!(v > 0.0 && v < 3.0, "dew point {}", v);
        }

        // Same answer with the humidity in g/kg
        let q_g = field_on(&grid, "q", Units::GramsPerKg, |_, _, _| 5.0);
        let dp_g = dew_point_from_specific_humidity(HectoPascal(850.0), &q_g).unwrap();
        for (&a, &b) in dp.values().iter().zip(dp_g.values().iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1.0e-9);
        }
    }

    #[test]
    fn test_dry_cells_are_missing() {
        let grid = test_grid(1);
        let q = field_on(&grid, "q", Units::KgPerKg, |_, y, x| {
            if y == 1 && x == 1 {
                0.0
            } else {
                0.005
            }
        });

        let dp = dew_point_from_specific_humidity(HectoPascal(850.0), &q).unwrap();
        assert!(dp.values()[[0, 1, 1]].is_nan());
        assert!(dp.values()[[0, 0, 0]].is_finite());
    }

    #[test]
    fn test_equivalent_potential_temperature() {
        let grid = test_grid(1);
        let t = field_on(&grid, "t", Units::Kelvin, |_, _, _| 290.0);
        let q = field_on(&grid, "q", Units::KgPerKg, |_, _, _| 0.005);

        let dp = dew_point_from_specific_humidity(HectoPascal(850.0), &q).unwrap();
        let theta_e = equivalent_potential_temperature(HectoPascal(850.0), &t, &dp).unwrap();

        assert_eq!(theta_e.units(), &Units::Kelvin);

        // The dry potential temperature is about 304 K, moisture adds roughly 2.5 K per g/kg.
        let theta = 290.0 * (1000.0f64 / 850.0).powf(0.2857);
        for &v in theta_e.values() {
            assert!(v > theta + 8.0 && v < theta + 20.0, "theta-e {}", v);
        }
    }

    #[test]
    fn test_theta_e_matches_bolton_reference() {
        // 850 hPa, 290 K, 5 g/kg is 319.28 K with Bolton's formula.
        let grid = test_grid(1);
        let t = field_on(&grid, "t", Units::Kelvin, |_, _, _| 290.0);
        let q = field_on(&grid, "q", Units::KgPerKg, |_, _, _| 0.005);

        let dp = dew_point_from_specific_humidity(HectoPascal(850.0), &q).unwrap();
        let theta_e = equivalent_potential_temperature(HectoPascal(850.0), &t, &dp).unwrap();

        for &v in theta_e.values() {
            assert_abs_diff_eq!(v, 319.28, epsilon = 0.05);
        }
    }

    #[test]
    fn test_theta_e_increases_with_temperature_and_moisture() {
        let grid = test_grid(1);
        let t = field_on(&grid, "t", Units::Kelvin, |_, _, x| 285.0 + 5.0 * x as f64);
        let q = field_on(&grid, "q", Units::KgPerKg, |_, y, _| 0.003 + 0.002 * y as f64);

        let dp = dew_point_from_specific_humidity(HectoPascal(850.0), &q).unwrap();
        let theta_e = equivalent_potential_temperature(HectoPascal(850.0), &t, &dp).unwrap();
        let v = theta_e.values();

        assert!(v[[0, 0, 0]] < v[[0, 0, 1]] && v[[0, 0, 1]] < v[[0, 0, 2]]);
        assert!(v[[0, 0, 0]] < v[[0, 1, 0]] && v[[0, 1, 0]] < v[[0, 2, 0]]);
    }

    #[test]
    fn test_check_pressure() {
        assert!(check_pressure(HectoPascal(850.0)).is_ok());
        assert!(check_pressure(HectoPascal(0.0)).is_err());
        assert!(check_pressure(HectoPascal(std::f64::NAN)).is_err());
    }
}
