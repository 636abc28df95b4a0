use crate::error::{AnalysisError, Result};
use chrono::NaiveDateTime;
use itertools::izip;

/// The horizontal and time coordinates shared by every field in an analysis.
///
/// Latitudes are in degrees north and longitudes in degrees east. Either may be stored in
/// ascending or descending order, reanalysis data usually runs north to south.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    times: Vec<NaiveDateTime>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
}

impl Grid {
    /// Create a new grid from its coordinate vectors.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use frontal_analysis::Grid;
    ///
    /// let t0 = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// let grid = Grid::new(vec![t0], vec![45.0, 44.75], vec![25.0, 25.25, 25.5]);
    ///
    /// assert_eq!(grid.shape(), (1, 2, 3));
    /// ```
    #[inline]
    pub fn new(times: Vec<NaiveDateTime>, latitudes: Vec<f64>, longitudes: Vec<f64>) -> Self {
        Grid {
            times,
            latitudes,
            longitudes,
        }
    }

    /// Get the valid times.
    #[inline]
    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    /// Get the latitudes in degrees north.
    #[inline]
    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    /// Get the longitudes in degrees east.
    #[inline]
    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    /// The shape of a field on this grid, `(time, latitude, longitude)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.latitudes.len(), self.longitudes.len())
    }

    /// Find the index of a valid time.
    #[inline]
    pub fn time_index(&self, time: NaiveDateTime) -> Option<usize> {
        self.times.iter().position(|&t| t == time)
    }

    /// Check that another grid has exactly the same coordinates, value for value.
    ///
    /// The error describes the first axis that differs.
    pub fn ensure_same_as(&self, other: &Grid) -> Result<()> {
        if self.times.len() != other.times.len() {
            return Err(AnalysisError::GridMismatch(format!(
                "time axis has {} vs {} values",
                self.times.len(),
                other.times.len()
            )));
        }

        if let Some((i, a, b)) = izip!(0usize.., &self.times, &other.times).find(|(_, a, b)| a != b)
        {
            return Err(AnalysisError::GridMismatch(format!(
                "time differs at index {} ({} vs {})",
                i, a, b
            )));
        }

        compare_axis("latitude", &self.latitudes, &other.latitudes)?;
        compare_axis("longitude", &self.longitudes, &other.longitudes)
    }
}

fn compare_axis(axis: &str, a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(AnalysisError::GridMismatch(format!(
            "{} axis has {} vs {} values",
            axis,
            a.len(),
            b.len()
        )));
    }

    match izip!(0usize.., a, b).find(|(_, x, y)| x != y) {
        Some((i, x, y)) => Err(AnalysisError::GridMismatch(format!(
            "{} differs at index {} ({} vs {})",
            axis, i, x, y
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::hours_from_start;

    fn make_grid() -> Grid {
        Grid::new(hours_from_start(2), vec![45.0, 44.75, 44.5], vec![25.0, 25.25])
    }

    #[test]
    fn test_same_grid() {
        let grid = make_grid();
        assert!(grid.ensure_same_as(&grid.clone()).is_ok());
        assert_eq!(grid.shape(), (2, 3, 2));
    }

    #[test]
    fn test_mismatched_grids() {
        let grid = make_grid();

        let fewer_times = Grid::new(hours_from_start(1), vec![45.0, 44.75, 44.5], vec![25.0, 25.25]);
        match grid.ensure_same_as(&fewer_times) {
            Err(AnalysisError::GridMismatch(msg)) => assert!(msg.contains("time")),
            other => panic!("unexpected result {:?}", other),
        }

        let shifted = Grid::new(hours_from_start(2), vec![45.0, 44.75, 44.5], vec![25.0, 25.5]);
        match grid.ensure_same_as(&shifted) {
            Err(AnalysisError::GridMismatch(msg)) => {
                assert!(msg.contains("longitude"));
                assert!(msg.contains("index 1"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_time_index() {
        let grid = make_grid();
        let times = hours_from_start(3);

        assert_eq!(grid.time_index(times[1]), Some(1));
        assert_eq!(grid.time_index(times[2]), None);
    }
}
