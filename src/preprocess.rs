//! Turn raw per-variable reanalysis downloads into a single archive per variable.
//!
//! Raw files are named `era5_<var>_<anything>.nc`, each holding a chunk of time. Every chunk is
//! cut down to the analysis domain and the chunks are then joined along the time axis.

use crate::{
    archive::ArchiveStore,
    error::{AnalysisError, Result},
    field::{Grid, LeveledField},
};
use itertools::{izip, Itertools};
use metfor::Quantity;
use ndarray::{Array4, Axis};
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, info};
use walkdir::WalkDir;

/// The reanalysis variables handled by the pipeline, displayed and parsed as their short names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Variable {
    /// Air temperature.
    #[strum(serialize = "t")]
    Temperature,
    /// Specific humidity.
    #[strum(serialize = "q")]
    SpecificHumidity,
    /// Eastward wind component.
    #[strum(serialize = "u")]
    UWind,
    /// Northward wind component.
    #[strum(serialize = "v")]
    VWind,
}

impl Variable {
    /// The variable name used inside the archives.
    pub fn short_name(self) -> &'static str {
        match self {
            Variable::Temperature => "t",
            Variable::SpecificHumidity => "q",
            Variable::UWind => "u",
            Variable::VWind => "v",
        }
    }

    /// Name of the preprocessed archive, e.g. `era5_t.nc`.
    pub fn processed_file_name(self) -> String {
        format!("era5_{}.nc", self.short_name())
    }

    fn is_raw_file_name(self, file_name: &str) -> bool {
        let prefix = format!("era5_{}_", self.short_name());
        file_name.starts_with(&prefix)
            && file_name.ends_with(".nc")
            && file_name.len() > prefix.len() + 3
    }
}

/// An inclusive range of coordinate values. The bounds may be given in either order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordRange {
    min: f64,
    max: f64,
}

impl CoordRange {
    /// Create a new range.
    pub fn new(a: f64, b: f64) -> Self {
        CoordRange {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The smaller bound.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// The larger bound.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Check if a value falls inside the range, bounds included.
    #[inline]
    pub fn contains(&self, val: f64) -> bool {
        val >= self.min && val <= self.max
    }

    fn indexes_within(&self, coords: &[f64]) -> Vec<usize> {
        coords
            .iter()
            .enumerate()
            .filter(|&(_, &c)| self.contains(c))
            .map(|(i, _)| i)
            .collect()
    }
}

impl From<(f64, f64)> for CoordRange {
    fn from((a, b): (f64, f64)) -> Self {
        CoordRange::new(a, b)
    }
}

/// List the raw files for a variable in `input_dir`, sorted by path.
///
/// Only the directory itself is searched, not sub-directories. An empty list means there is
/// nothing to process, it is not an error.
pub fn discover_raw_files(input_dir: &Path, variable: Variable) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(AnalysisError::MissingFile(input_dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .file_name()
            .to_str()
            .map(|name| variable.is_raw_file_name(name))
            .unwrap_or(false);

        if matches {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!(variable = %variable, count = files.len(), "discovered raw files");
    Ok(files)
}

/// Cut a field down to the latitudes and longitudes inside the given ranges.
///
/// The source coordinate order is preserved. Fails if nothing is left along either axis.
pub fn subset(
    field: &LeveledField,
    lat_range: CoordRange,
    lon_range: CoordRange,
) -> Result<LeveledField> {
    let grid = field.grid();

    let lat_idx = lat_range.indexes_within(grid.latitudes());
    let lon_idx = lon_range.indexes_within(grid.longitudes());

    if lat_idx.is_empty() || lon_idx.is_empty() {
        return Err(AnalysisError::InvalidInput(format!(
            "'{}' has no points in latitudes [{}, {}] and longitudes [{}, {}]",
            field.name(),
            lat_range.min(),
            lat_range.max(),
            lon_range.min(),
            lon_range.max()
        )));
    }

    let lats = lat_idx.iter().map(|&i| grid.latitudes()[i]).collect();
    let lons = lon_idx.iter().map(|&i| grid.longitudes()[i]).collect();
    let values = field
        .values()
        .select(Axis(2), &lat_idx)
        .select(Axis(3), &lon_idx);

    LeveledField::new(
        field.name(),
        field.units().clone(),
        field.levels().to_vec(),
        Grid::new(grid.times().to_vec(), lats, lons),
        values,
    )
}

/// Join fields that differ only in their time coordinates.
///
/// The output times are sorted ascending. Every field must have the same units, levels,
/// latitudes, and longitudes, and no time may appear twice.
pub fn merge_along_time(fields: &[LeveledField]) -> Result<LeveledField> {
    let first = fields.first().ok_or(AnalysisError::NotEnoughData)?;
    let spatial = |f: &LeveledField| {
        Grid::new(
            vec![],
            f.grid().latitudes().to_vec(),
            f.grid().longitudes().to_vec(),
        )
    };
    let first_spatial = spatial(first);

    for field in &fields[1..] {
        if field.units() != first.units() {
            return Err(AnalysisError::UnitMismatch {
                expected: first.units().to_string(),
                found: field.units().to_string(),
            });
        }

        let same_levels = field.levels().len() == first.levels().len()
            && izip!(field.levels(), first.levels()).all(|(a, b)| a.unpack() == b.unpack());
        if !same_levels {
            return Err(AnalysisError::GridMismatch(format!(
                "pressure levels of '{}' differ between files",
                first.name()
            )));
        }

        first_spatial.ensure_same_as(&spatial(field))?;
    }

    // (time, which field, time index within that field)
    let mut order: Vec<_> = fields
        .iter()
        .enumerate()
        .flat_map(|(f_idx, f)| {
            f.grid()
                .times()
                .iter()
                .enumerate()
                .map(move |(t_idx, &t)| (t, f_idx, t_idx))
        })
        .collect();
    order.sort_by_key(|&(t, _, _)| t);

    if let Some(((t, _, _), _)) = order
        .iter()
        .tuple_windows()
        .find(|((t0, _, _), (t1, _, _))| t0 == t1)
    {
        return Err(AnalysisError::InvalidInput(format!(
            "duplicate time {} while merging '{}'",
            t,
            first.name()
        )));
    }

    let (_, n_lvl, n_lat, n_lon) = first.values().dim();
    let mut values = Array4::from_elem((order.len(), n_lvl, n_lat, n_lon), std::f64::NAN);
    for (mut dest, &(_, f_idx, t_idx)) in values.outer_iter_mut().zip(&order) {
        dest.assign(&fields[f_idx].values().index_axis(Axis(0), t_idx));
    }

    let times = order.iter().map(|&(t, _, _)| t).collect();

    LeveledField::new(
        first.name(),
        first.units().clone(),
        first.levels().to_vec(),
        Grid::new(
            times,
            first.grid().latitudes().to_vec(),
            first.grid().longitudes().to_vec(),
        ),
        values,
    )
}

/// Read, subset, and merge the raw files for one variable.
///
/// Returns `None` if there were no raw files.
pub fn preprocess_variable<A>(
    archive: &A,
    input_dir: &Path,
    variable: Variable,
    lat_range: CoordRange,
    lon_range: CoordRange,
) -> Result<Option<LeveledField>>
where
    A: ArchiveStore + ?Sized,
{
    let files = discover_raw_files(input_dir, variable)?;
    if files.is_empty() {
        return Ok(None);
    }

    let subsets = files
        .iter()
        .map(|path| {
            archive
                .read_leveled(path, variable.short_name())
                .and_then(|field| subset(&field, lat_range, lon_range))
        })
        .collect::<Result<Vec<_>>>()?;

    let merged = merge_along_time(&subsets)?;
    info!(
        variable = %variable,
        files = files.len(),
        times = merged.grid().times().len(),
        "merged raw files"
    );

    Ok(Some(merged))
}
