//! Decode and encode CF convention time coordinates, e.g. `hours since 1900-01-01 00:00:00.0`.
//!
//! Only the standard (proleptic Gregorian) calendar is supported, which is what reanalysis
//! archives use.

use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::str::FromStr;

/// The unit of a time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStep {
    /// Seconds
    Seconds,
    /// Minutes
    Minutes,
    /// Hours
    Hours,
    /// Days
    Days,
}

impl TimeStep {
    fn seconds(self) -> f64 {
        match self {
            TimeStep::Seconds => 1.0,
            TimeStep::Minutes => 60.0,
            TimeStep::Hours => 3_600.0,
            TimeStep::Days => 86_400.0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            TimeStep::Seconds => "seconds",
            TimeStep::Minutes => "minutes",
            TimeStep::Hours => "hours",
            TimeStep::Days => "days",
        }
    }
}

/// A parsed CF `units` attribute for a time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    /// Size of one unit of offset.
    pub step: TimeStep,
    /// The reference time offsets are counted from.
    pub reference: NaiveDateTime,
}

impl TimeUnits {
    /// Seconds since the unix epoch, the encoding used when writing new archives.
    pub fn unix_seconds() -> Self {
        TimeUnits {
            step: TimeStep::Seconds,
            reference: DateTime::<Utc>::UNIX_EPOCH.naive_utc(),
        }
    }

    /// Convert an offset to a date and time, rounded to the nearest millisecond.
    pub fn decode(&self, offset: f64) -> Result<NaiveDateTime> {
        if !offset.is_finite() {
            return Err(AnalysisError::Time(format!("non-finite time offset {}", offset)));
        }

        let millis = (offset * self.step.seconds() * 1_000.0).round();
        if millis.abs() > i64::MAX as f64 / 2.0 {
            return Err(AnalysisError::Time(format!("time offset {} out of range", offset)));
        }

        self.reference
            .checked_add_signed(Duration::milliseconds(millis as i64))
            .ok_or_else(|| AnalysisError::Time(format!("time offset {} out of range", offset)))
    }

    /// Convert a date and time to an offset in these units.
    pub fn encode(&self, time: NaiveDateTime) -> f64 {
        let millis = (time - self.reference).num_milliseconds() as f64;
        millis / 1_000.0 / self.step.seconds()
    }
}

impl std::fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} since {}",
            self.step.name(),
            self.reference.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

impl FromStr for TimeUnits {
    type Err = AnalysisError;

    /// Parse a CF time units string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use frontal_analysis::cf_time::{TimeStep, TimeUnits};
    ///
    /// let units: TimeUnits = "hours since 1900-01-01 00:00:00.0".parse().unwrap();
    /// assert_eq!(units.step, TimeStep::Hours);
    ///
    /// let t = units.decode(1_098_168.0).unwrap();
    /// assert_eq!(t.format("%Y-%m-%d %H").to_string(), "2025-04-12 00");
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let bad = || AnalysisError::Time(format!("unrecognized time units '{}'", s));

        let mut parts = s.trim().splitn(2, " since ");
        let step = match parts.next().map(|p| p.trim().to_lowercase()).as_deref() {
            Some("seconds") | Some("second") | Some("secs") | Some("s") => TimeStep::Seconds,
            Some("minutes") | Some("minute") | Some("mins") => TimeStep::Minutes,
            Some("hours") | Some("hour") | Some("hrs") | Some("h") => TimeStep::Hours,
            Some("days") | Some("day") | Some("d") => TimeStep::Days,
            _ => return Err(bad()),
        };

        let reference = parts.next().ok_or_else(bad)?;
        let reference = parse_reference_time(reference).ok_or_else(bad)?;

        Ok(TimeUnits { step, reference })
    }
}

// Strip a trailing time zone designator, only UTC is supported.
fn parse_reference_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    let s = s
        .strip_suffix(" UTC")
        .or_else(|| s.strip_suffix('Z'))
        .or_else(|| s.strip_suffix(" +00:00"))
        .unwrap_or(s)
        .trim();

    const DATE_TIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    DATE_TIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .next()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
