use crate::{
    archive::ArchiveStore,
    cf_time::TimeUnits,
    error::{AnalysisError, Result},
    field::{Grid, LeveledField},
    fronts::{FrontMask, FRONT_LEVEL, FRONT_MASK_NAME},
    units::Units,
};
use chrono::NaiveDateTime;
use metfor::{HectoPascal, Quantity};
use ndarray::{Array3, Array4};
use std::path::Path;
use tracing::debug;

const TIME_NAMES: [&str; 2] = ["time", "valid_time"];
const LEVEL_NAMES: [&str; 3] = ["isobaricInhPa", "pressure_level", "level"];
const LAT_NAMES: [&str; 2] = ["latitude", "lat"];
const LON_NAMES: [&str; 2] = ["longitude", "lon"];

/// Attribute on the mask variable recording the level it was derived on.
const LEVEL_ATTRIBUTE: &str = "pressure_level_hPa";

/// Reads and writes CF style NetCDF files.
///
/// Variables are read with dimensions `(time, level, latitude, longitude)`, or
/// `(time, latitude, longitude)` when the file has a scalar level coordinate. The common ERA5
/// dimension names are all accepted. Packed values are unpacked and fill values become NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Time,
    Level,
    Latitude,
    Longitude,
}

impl Role {
    fn of(dim_name: &str) -> Option<Role> {
        if TIME_NAMES.contains(&dim_name) {
            Some(Role::Time)
        } else if LEVEL_NAMES.contains(&dim_name) {
            Some(Role::Level)
        } else if LAT_NAMES.contains(&dim_name) {
            Some(Role::Latitude)
        } else if LON_NAMES.contains(&dim_name) {
            Some(Role::Longitude)
        } else {
            None
        }
    }
}

impl ArchiveStore for NetCdfArchive {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_leveled(&self, path: &Path, variable: &str) -> Result<LeveledField> {
        if !path.is_file() {
            return Err(AnalysisError::MissingFile(path.to_path_buf()));
        }

        let file = netcdf::open(path)?;
        let var = file.variable(variable).ok_or_else(|| {
            AnalysisError::MissingVariable(format!("{} in {}", variable, path.display()))
        })?;

        let roles: Vec<Option<Role>> = var
            .dimensions()
            .iter()
            .map(|dim| Role::of(&dim.name()))
            .collect();

        let times = read_times(&file)?;
        let latitudes = read_coord(&file, &LAT_NAMES)?;
        let longitudes = read_coord(&file, &LON_NAMES)?;

        use self::Role::*;
        let levels = match roles.as_slice() {
            [Some(Time), Some(Level), Some(Latitude), Some(Longitude)] => {
                read_levels(&file)?
            }
            // Single level downloads drop the level dimension but keep a scalar coordinate.
            [Some(Time), Some(Latitude), Some(Longitude)] => {
                let levels = read_levels(&file)?;
                if levels.len() != 1 {
                    return Err(AnalysisError::InvalidInput(format!(
                        "'{}' in {} has no level dimension and {} levels",
                        variable,
                        path.display(),
                        levels.len()
                    )));
                }
                levels
            }
            _ => {
                let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
                return Err(AnalysisError::InvalidInput(format!(
                    "'{}' in {} has unsupported dimensions {:?}",
                    variable,
                    path.display(),
                    dims
                )));
            }
        };

        let units = string_attribute(&var, "units")
            .map(|u| u.parse::<Units>().unwrap_or(Units::Dimensionless))
            .unwrap_or(Units::Dimensionless);

        let raw: Vec<f64> = var.get_values(..)?;
        let values = unpack(&var, raw);

        let shape = (times.len(), levels.len(), latitudes.len(), longitudes.len());
        let values = Array4::from_shape_vec(shape, values)
            .map_err(|err| AnalysisError::InvalidInput(format!("'{}': {}", variable, err)))?;

        debug!(path = %path.display(), variable, ?shape, "read archive");

        LeveledField::new(
            variable,
            units,
            levels,
            Grid::new(times, latitudes, longitudes),
            values,
        )
    }

    fn write_leveled(&mut self, path: &Path, field: &LeveledField) -> Result<()> {
        let mut file = netcdf::create(path)?;
        add_grid(&mut file, field.grid())?;

        file.add_dimension(LEVEL_NAMES[0], field.levels().len())?;
        {
            let levels: Vec<f64> = field.levels().iter().map(|p| p.unpack()).collect();
            let mut var = file.add_variable::<f64>(LEVEL_NAMES[0], &[LEVEL_NAMES[0]])?;
            var.put_attribute("long_name", "pressure")?;
            var.put_attribute("units", "hPa")?;
            var.put_attribute("positive", "down")?;
            var.put_values(&levels, ..)?;
        }

        {
            let values: Vec<f64> = field.values().iter().cloned().collect();
            let mut var = file.add_variable::<f64>(
                field.name(),
                &[TIME_NAMES[0], LEVEL_NAMES[0], LAT_NAMES[0], LON_NAMES[0]],
            )?;
            var.put_attribute("units", field.units().to_string().as_str())?;
            var.put_attribute("_FillValue", std::f64::NAN)?;
            var.put_values(&values, ..)?;
        }

        file.add_attribute("Conventions", "CF-1.8")?;
        debug!(path = %path.display(), variable = field.name(), "wrote archive");
        Ok(())
    }

    fn read_mask(&self, path: &Path) -> Result<FrontMask> {
        if !path.is_file() {
            return Err(AnalysisError::MissingFile(path.to_path_buf()));
        }

        let file = netcdf::open(path)?;
        let var = file.variable(FRONT_MASK_NAME).ok_or_else(|| {
            AnalysisError::MissingVariable(format!("{} in {}", FRONT_MASK_NAME, path.display()))
        })?;

        let times = read_times(&file)?;
        let latitudes = read_coord(&file, &LAT_NAMES)?;
        let longitudes = read_coord(&file, &LON_NAMES)?;

        let level = numeric_attribute(&var, LEVEL_ATTRIBUTE)
            .map(HectoPascal)
            .unwrap_or(FRONT_LEVEL);

        let raw: Vec<i32> = var.get_values(..)?;
        let shape = (times.len(), latitudes.len(), longitudes.len());
        let values = Array3::from_shape_vec(shape, raw)
            .map_err(|err| AnalysisError::InvalidInput(format!("{}: {}", FRONT_MASK_NAME, err)))?;

        FrontMask::new(Grid::new(times, latitudes, longitudes), level, values)
    }

    fn write_mask(&mut self, path: &Path, mask: &FrontMask) -> Result<()> {
        let mut file = netcdf::create(path)?;
        add_grid(&mut file, mask.grid())?;

        {
            let values: Vec<i32> = mask.values().iter().cloned().collect();
            let mut var = file.add_variable::<i32>(
                FRONT_MASK_NAME,
                &[TIME_NAMES[0], LAT_NAMES[0], LON_NAMES[0]],
            )?;
            var.put_attribute("long_name", "frontal zone mask")?;
            var.put_attribute("units", "1")?;
            var.put_attribute(LEVEL_ATTRIBUTE, mask.level().unpack())?;
            var.put_values(&values, ..)?;
        }

        file.add_attribute("Conventions", "CF-1.8")?;
        debug!(path = %path.display(), "wrote front mask");
        Ok(())
    }
}

/// Add the time, latitude, and longitude dimensions with their coordinate variables.
fn add_grid(file: &mut netcdf::FileMut, grid: &Grid) -> Result<()> {
    let (nt, ny, nx) = grid.shape();
    file.add_dimension(TIME_NAMES[0], nt)?;
    file.add_dimension(LAT_NAMES[0], ny)?;
    file.add_dimension(LON_NAMES[0], nx)?;

    let time_units = TimeUnits::unix_seconds();
    let times: Vec<f64> = grid.times().iter().map(|&t| time_units.encode(t)).collect();
    {
        let mut var = file.add_variable::<f64>(TIME_NAMES[0], &[TIME_NAMES[0]])?;
        var.put_attribute("standard_name", "time")?;
        var.put_attribute("units", time_units.to_string().as_str())?;
        var.put_attribute("calendar", "standard")?;
        var.put_values(&times, ..)?;
    }
    {
        let mut var = file.add_variable::<f64>(LAT_NAMES[0], &[LAT_NAMES[0]])?;
        var.put_attribute("standard_name", "latitude")?;
        var.put_attribute("units", "degrees_north")?;
        var.put_values(grid.latitudes(), ..)?;
    }
    {
        let mut var = file.add_variable::<f64>(LON_NAMES[0], &[LON_NAMES[0]])?;
        var.put_attribute("standard_name", "longitude")?;
        var.put_attribute("units", "degrees_east")?;
        var.put_values(grid.longitudes(), ..)?;
    }

    Ok(())
}

fn find_variable<'f>(file: &'f netcdf::File, names: &[&str]) -> Result<netcdf::Variable<'f>> {
    names
        .iter()
        .filter_map(|name| file.variable(name))
        .next()
        .ok_or_else(|| AnalysisError::MissingVariable(names.join(" or ")))
}

fn read_coord(file: &netcdf::File, names: &[&str]) -> Result<Vec<f64>> {
    let var = find_variable(file, names)?;
    Ok(var.get_values(..)?)
}

fn read_times(file: &netcdf::File) -> Result<Vec<NaiveDateTime>> {
    let var = find_variable(file, &TIME_NAMES)?;
    let units: TimeUnits = string_attribute(&var, "units")
        .ok_or_else(|| AnalysisError::Time("time coordinate has no units".to_owned()))?
        .parse()?;

    let offsets: Vec<f64> = var.get_values(..)?;
    offsets.into_iter().map(|off| units.decode(off)).collect()
}

// Level coordinates are usually hPa, but some converters write Pa.
fn read_levels(file: &netcdf::File) -> Result<Vec<HectoPascal>> {
    let var = find_variable(file, &LEVEL_NAMES)?;
    let scale = match string_attribute(&var, "units").map(|u| u.parse::<Units>()) {
        Some(Ok(Units::Pascal)) => 0.01,
        _ => 1.0,
    };

    let raw: Vec<f64> = var.get_values(..)?;
    Ok(raw.into_iter().map(|p| HectoPascal(p * scale)).collect())
}

fn unpack(var: &netcdf::Variable, raw: Vec<f64>) -> Vec<f64> {
    let scale = numeric_attribute(var, "scale_factor").unwrap_or(1.0);
    let offset = numeric_attribute(var, "add_offset").unwrap_or(0.0);
    let fill = numeric_attribute(var, "_FillValue");
    let missing = numeric_attribute(var, "missing_value");

    raw.into_iter()
        .map(|v| {
            // Filter out the fill and missing markers, they are compared before unpacking.
            if !v.is_finite() || Some(v) == fill || Some(v) == missing {
                std::f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect()
}

fn numeric_attribute(var: &netcdf::Variable, name: &str) -> Option<f64> {
    use netcdf::AttributeValue::*;

    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            Double(d) => Some(d),
            Float(f) => Some(f64::from(f)),
            Int(i) => Some(f64::from(i)),
            Short(s) => Some(f64::from(s)),
            _ => None,
        })
}

fn string_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}
