//! Plan map overlays of the front mask on the 850 hPa temperature.
//!
//! Each frame pairs one time step of the mask with the temperature at the same time. Turning a
//! frame into an image is the job of a `FrameRenderer`.

use crate::{
    error::{AnalysisError, Result},
    field::{Grid, LeveledField},
    fronts::FrontMask,
    units::Units,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use metfor::Quantity;
use ndarray::{Array2, Axis};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Number of filled contour levels used for temperature.
pub const TEMPERATURE_CONTOUR_LEVELS: usize = 20;

/// The single contour level outlining frontal zones in the mask.
pub const MASK_CONTOUR_LEVEL: f64 = 0.5;

/// An inclusive range of valid times to plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeRange {
    /// Create a range from its first and last times, both included.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(AnalysisError::InvalidInput(format!(
                "time range starts at {} after it ends at {}",
                start, end
            )));
        }

        Ok(TimeRange { start, end })
    }

    /// Parse a range from strings like `2025-10-01` or `2025-10-01 06:00`.
    ///
    /// A date without a time starts at midnight when used as the start, and covers the whole day
    /// when used as the end.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use frontal_analysis::plot::TimeRange;
    ///
    /// let range = TimeRange::parse("2025-10-01", "2025-10-02").unwrap();
    ///
    /// let late = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap().and_hms_opt(23, 0, 0).unwrap();
    /// assert!(range.contains(late));
    ///
    /// let too_late = NaiveDate::from_ymd_opt(2025, 10, 3).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// assert!(!range.contains(too_late));
    /// ```
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let (start, _) = parse_bound(start)?;
        let (end, date_only) = parse_bound(end)?;

        let end = if date_only {
            end + Duration::days(1) - Duration::milliseconds(1)
        } else {
            end
        };

        TimeRange::new(start, end)
    }

    /// The first time in the range.
    #[inline]
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// The last time in the range.
    #[inline]
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Check if a time falls inside the range.
    #[inline]
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time <= self.end
    }
}

// Returns the parsed time and whether it was only a date.
fn parse_bound(s: &str) -> Result<(NaiveDateTime, bool)> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    let s = s.trim();
    if let Some(time) = FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .next()
    {
        return Ok((time, false));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|time| (time, true))
        .ok_or_else(|| AnalysisError::Time(format!("unable to parse '{}' as a date or time", s)))
}

/// Everything needed to draw one map.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotFrame {
    /// Valid time of the frame.
    pub time: NaiveDateTime,
    /// Image file name, `front_map_<YYYY-MM-DD_HH>.png`.
    pub file_name: String,
    /// Two line title with the valid time.
    pub title: String,
    /// Temperature in Celsius, indexed `(latitude, longitude)`.
    pub temperature: Array2<f64>,
    /// The front mask, indexed `(latitude, longitude)`.
    pub mask: Array2<i32>,
    /// Latitudes in degrees north.
    pub latitudes: Vec<f64>,
    /// Longitudes in degrees east.
    pub longitudes: Vec<f64>,
    /// Filled contour levels for temperature, ascending.
    pub contour_levels: Vec<f64>,
    /// Contour level for outlining the mask.
    pub mask_level: f64,
}

impl PlotFrame {
    /// Number of frontal cells in this frame.
    pub fn front_cells(&self) -> usize {
        self.mask.iter().filter(|&&v| v == 1).count()
    }
}

/// Image file name for a valid time.
pub fn frame_file_name(time: NaiveDateTime) -> String {
    format!("front_map_{}.png", time.format("%Y-%m-%d_%H"))
}

/// Select the time steps to plot and pair them with temperature on the mask's level.
///
/// With no time range every step is a candidate. At most `max_plots` frames are returned, the
/// earliest first. If nothing falls in the range a warning is logged and the list is empty.
pub fn plan_frames(
    mask: &FrontMask,
    temperature: &LeveledField,
    time_range: Option<&TimeRange>,
    max_plots: usize,
) -> Result<Vec<PlotFrame>> {
    let temperature = temperature
        .select_level(mask.level())?
        .convert_to(Units::Celsius)?;

    let spatial = |g: &Grid| Grid::new(vec![], g.latitudes().to_vec(), g.longitudes().to_vec());
    spatial(mask.grid()).ensure_same_as(&spatial(temperature.grid()))?;

    let mut selected: Vec<(usize, NaiveDateTime)> = mask
        .grid()
        .times()
        .iter()
        .cloned()
        .enumerate()
        .filter(|&(_, t)| time_range.map(|r| r.contains(t)).unwrap_or(true))
        .collect();
    selected.sort_by_key(|&(_, t)| t);

    if selected.is_empty() {
        warn!("no mask time steps in the requested time range, nothing to plot");
        return Ok(vec![]);
    }

    let mut frames = Vec::with_capacity(max_plots.min(selected.len()));
    for (mask_idx, time) in selected {
        if frames.len() >= max_plots {
            break;
        }

        let t_idx = match temperature.grid().time_index(time) {
            Some(idx) => idx,
            None => {
                warn!(%time, "no temperature for mask time step, skipping");
                continue;
            }
        };

        let temps = temperature.values().index_axis(Axis(0), t_idx).to_owned();
        let contour_levels = contour_levels(&temps, TEMPERATURE_CONTOUR_LEVELS);

        frames.push(PlotFrame {
            time,
            file_name: frame_file_name(time),
            title: format!(
                "Frontal Zones and {:.0} hPa Temperature\n{}",
                mask.level().unpack(),
                time.format("%Y-%m-%d_%H")
            ),
            temperature: temps,
            mask: mask.time_slice(mask_idx).to_owned(),
            latitudes: mask.grid().latitudes().to_vec(),
            longitudes: mask.grid().longitudes().to_vec(),
            contour_levels,
            mask_level: MASK_CONTOUR_LEVEL,
        });
    }

    Ok(frames)
}

/// Evenly spaced levels from the smallest to the largest finite value.
fn contour_levels(values: &Array2<f64>, n: usize) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .cloned()
        // Filter out missing values
        .filter(|v| v.is_finite())
        .fold((std::f64::INFINITY, std::f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() || n == 0 {
        return vec![];
    }

    if n == 1 || min == max {
        return vec![min];
    }

    let step = (max - min) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { max } else { min + step * i as f64 })
        .collect()
}

/// What a renderer did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutput {
    /// An image was written at the requested path.
    Written,
    /// The frame was accepted but no file was made.
    Planned,
}

/// Something that can turn a frame into an image file.
pub trait FrameRenderer {
    /// Draw `frame` at `path`, reporting whether a file was actually written.
    fn render(&mut self, frame: &PlotFrame, path: &Path) -> Result<FrameOutput>;
}

/// A renderer that only logs what it would draw, it never writes a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRenderer;

impl FrameRenderer for LogRenderer {
    fn render(&mut self, frame: &PlotFrame, path: &Path) -> Result<FrameOutput> {
        info!(
            path = %path.display(),
            time = %frame.time,
            front_cells = frame.front_cells(),
            "planned frame, no image written"
        );
        Ok(FrameOutput::Planned)
    }
}

/// Render every frame into `output_dir`, creating it if needed.
///
/// Returns the paths of the images that were written. Frames the renderer only planned are left
/// out.
pub fn render_frames<R>(
    renderer: &mut R,
    frames: &[PlotFrame],
    output_dir: &Path,
) -> Result<Vec<PathBuf>>
where
    R: FrameRenderer + ?Sized,
{
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(frames.len());
    for frame in frames {
        let path = output_dir.join(&frame.file_name);
        if renderer.render(frame, &path)? == FrameOutput::Written {
            info!(path = %path.display(), "saved plot");
            written.push(path);
        }
    }

    Ok(written)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        fronts::FRONT_LEVEL,
        test_data::{hours_from_start, leveled_field, test_grid},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;

    fn ymdh(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, d)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    fn six_hour_mask() -> FrontMask {
        let values = Array3::from_shape_fn((6, 3, 3), |(t, y, _)| if y == t % 3 { 1 } else { 0 });
        FrontMask::new(test_grid(6), FRONT_LEVEL, values).unwrap()
    }

    fn six_hour_temperature() -> LeveledField {
        leveled_field("t", Units::Kelvin, &[850.0], 6, |t, _, _, x| {
            273.15 + t as f64 + x as f64
        })
    }

    #[derive(Default)]
    struct Recorder {
        paths: Vec<PathBuf>,
    }

    impl FrameRenderer for Recorder {
        fn render(&mut self, _frame: &PlotFrame, path: &Path) -> Result<FrameOutput> {
            std::fs::write(path, b"")?;
            self.paths.push(path.to_path_buf());
            Ok(FrameOutput::Written)
        }
    }

    #[test]
    fn test_parse_time_range() {
        let range = TimeRange::parse("2025-10-01", "2025-10-01").unwrap();
        assert_eq!(range.start(), ymdh(1, 0));
        assert!(range.contains(ymdh(1, 23)));
        assert!(!range.contains(ymdh(2, 0)));

        let range = TimeRange::parse("2025-10-01 06:00", "2025-10-01T12:00:00").unwrap();
        assert!(!range.contains(ymdh(1, 5)));
        assert!(range.contains(ymdh(1, 6)));
        assert!(range.contains(ymdh(1, 12)));
        assert!(!range.contains(ymdh(1, 13)));

        assert!(TimeRange::parse("2025-10-02", "2025-10-01").is_err());
        assert!(TimeRange::parse("last tuesday", "2025-10-01").is_err());
    }

    #[test]
    fn test_frame_file_name() {
        assert_eq!(frame_file_name(ymdh(3, 6)), "front_map_2025-10-03_06.png");
    }

    #[test]
    fn test_plan_all_frames() {
        let frames = plan_frames(&six_hour_mask(), &six_hour_temperature(), None, 10).unwrap();
        assert_eq!(frames.len(), 6);

        let times: Vec<_> = frames.iter().map(|f| f.time).collect();
        assert_eq!(times, hours_from_start(6));

        let frame = &frames[2];
        assert_eq!(frame.file_name, "front_map_2025-10-01_02.png");
        assert_eq!(
            frame.title,
            "Frontal Zones and 850 hPa Temperature\n2025-10-01_02"
        );
        assert_abs_diff_eq!(frame.temperature[[0, 0]], 2.0, epsilon = 1.0e-9);
        assert_abs_diff_eq!(frame.temperature[[0, 2]], 4.0, epsilon = 1.0e-9);
        assert_eq!(frame.front_cells(), 3);
        assert_eq!(frame.mask[[2, 0]], 1);
        assert_eq!(frame.latitudes, vec![45.0, 44.75, 44.5]);
        assert_eq!(frame.mask_level, MASK_CONTOUR_LEVEL);

        assert_eq!(frame.contour_levels.len(), TEMPERATURE_CONTOUR_LEVELS);
        assert_abs_diff_eq!(frame.contour_levels[0], 2.0, epsilon = 1.0e-9);
        assert_abs_diff_eq!(frame.contour_levels[19], 4.0, epsilon = 1.0e-9);
    }

    #[test]
    fn test_plan_frames_in_range() {
        let range = TimeRange::parse("2025-10-01 02:00", "2025-10-01 04:00").unwrap();

        let frames =
            plan_frames(&six_hour_mask(), &six_hour_temperature(), Some(&range), 5).unwrap();
        let names: Vec<_> = frames.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "front_map_2025-10-01_02.png",
                "front_map_2025-10-01_03.png",
                "front_map_2025-10-01_04.png"
            ]
        );

        let frames =
            plan_frames(&six_hour_mask(), &six_hour_temperature(), Some(&range), 2).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].time, ymdh(1, 3));
    }

    #[test]
    fn test_plan_frames_out_of_range() {
        let range = TimeRange::parse("2025-11-01", "2025-11-02").unwrap();
        let frames =
            plan_frames(&six_hour_mask(), &six_hour_temperature(), Some(&range), 5).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn test_plan_frames_needs_level() {
        let t700 = leveled_field("t", Units::Kelvin, &[700.0], 6, |_, _, _, _| 270.0);
        assert!(matches!(
            plan_frames(&six_hour_mask(), &t700, None, 5),
            Err(AnalysisError::MissingLevel { .. })
        ));
    }

    #[test]
    fn test_contour_levels() {
        let values = Array2::from_shape_vec((2, 2), vec![1.0, std::f64::NAN, 3.0, 2.0]).unwrap();
        assert_eq!(contour_levels(&values, 3), vec![1.0, 2.0, 3.0]);

        let flat = Array2::from_elem((2, 2), 5.0);
        assert_eq!(contour_levels(&flat, 20), vec![5.0]);

        let empty = Array2::from_elem((2, 2), std::f64::NAN);
        assert!(contour_levels(&empty, 20).is_empty());
    }

    #[test]
    fn test_render_frames() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plots");
        let frames = plan_frames(&six_hour_mask(), &six_hour_temperature(), None, 2).unwrap();

        let mut recorder = Recorder::default();
        let paths = render_frames(&mut recorder, &frames, &out).unwrap();

        assert!(out.is_dir());
        assert_eq!(paths, recorder.paths);
        assert_eq!(paths[0], out.join("front_map_2025-10-01_00.png"));
        assert!(paths.iter().all(|p| p.is_file()));
    }

    #[test]
    fn test_planned_frames_are_not_reported_as_saved() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plots");
        let frames = plan_frames(&six_hour_mask(), &six_hour_temperature(), None, 3).unwrap();

        let mut logger = LogRenderer;
        let paths = render_frames(&mut logger, &frames, &out).unwrap();

        assert!(paths.is_empty());
        assert!(!out.join(&frames[0].file_name).exists());
    }
}
