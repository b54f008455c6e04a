use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::TemporalError;

/// Named units of time with fixed conversion factors.
///
/// A month is four weeks and a year is 365 days; neither follows the civil
/// calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    /// All units, shortest first.
    pub const ASCENDING: [TimeUnit; 7] = [
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
        TimeUnit::Month,
        TimeUnit::Year,
    ];

    pub const fn seconds(self) -> u64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 60 * 60,
            TimeUnit::Day => 24 * 60 * 60,
            TimeUnit::Week => 7 * 24 * 60 * 60,
            TimeUnit::Month => 4 * 7 * 24 * 60 * 60,
            TimeUnit::Year => 365 * 24 * 60 * 60,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-negative length of time in whole seconds, or the `Unknown` sentinel.
///
/// `Unknown` absorbs `add`/`subtract`/`multiply` and rejects everything that
/// would have to produce a number (conversions, ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DurationRepr", into = "DurationRepr")]
pub enum Duration {
    Known(u64),
    Unknown,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Seconds(u64),
    Marker(String),
}

const UNKNOWN_MARKER: &str = "unknown";

impl TryFrom<DurationRepr> for Duration {
    type Error = String;

    fn try_from(value: DurationRepr) -> Result<Self, Self::Error> {
        match value {
            DurationRepr::Seconds(secs) => Ok(Duration::Known(secs)),
            DurationRepr::Marker(marker) if marker.eq_ignore_ascii_case(UNKNOWN_MARKER) => {
                Ok(Duration::Unknown)
            }
            DurationRepr::Marker(other) => Err(format!(
                "expected a number of seconds or \"{UNKNOWN_MARKER}\", got \"{other}\""
            )),
        }
    }
}

impl From<Duration> for DurationRepr {
    fn from(value: Duration) -> Self {
        match value {
            Duration::Known(secs) => DurationRepr::Seconds(secs),
            Duration::Unknown => DurationRepr::Marker(UNKNOWN_MARKER.to_string()),
        }
    }
}

impl Default for Duration {
    fn default() -> Self {
        Duration::ZERO
    }
}

impl Duration {
    pub const ZERO: Duration = Duration::Known(0);
    pub const UNKNOWN: Duration = Duration::Unknown;

    pub const fn seconds(secs: u64) -> Self {
        Duration::Known(secs)
    }

    /// Panics when the seconds overflow `u64`; [`Duration::of`] reports that
    /// as an error instead.
    pub const fn minutes(minutes: u64) -> Self {
        match minutes.checked_mul(TimeUnit::Minute.seconds()) {
            Some(secs) => Duration::Known(secs),
            None => panic!("minutes overflow a duration"),
        }
    }

    /// Panics on overflow, like [`Duration::minutes`].
    pub const fn hours(hours: u64) -> Self {
        match hours.checked_mul(TimeUnit::Hour.seconds()) {
            Some(secs) => Duration::Known(secs),
            None => panic!("hours overflow a duration"),
        }
    }

    /// Panics on overflow, like [`Duration::minutes`].
    pub const fn days(days: u64) -> Self {
        match days.checked_mul(TimeUnit::Day.seconds()) {
            Some(secs) => Duration::Known(secs),
            None => panic!("days overflow a duration"),
        }
    }

    /// Panics on overflow, like [`Duration::minutes`].
    pub const fn weeks(weeks: u64) -> Self {
        match weeks.checked_mul(TimeUnit::Week.seconds()) {
            Some(secs) => Duration::Known(secs),
            None => panic!("weeks overflow a duration"),
        }
    }

    /// Builds a duration from a signed second count, rejecting negatives.
    pub fn from_seconds(secs: i64) -> Result<Self, TemporalError> {
        u64::try_from(secs).map(Duration::Known).map_err(|_| {
            TemporalError::InvalidArgument(format!("duration must not be negative (got {secs}s)"))
        })
    }

    pub fn of(amount: u64, unit: TimeUnit) -> Result<Self, TemporalError> {
        amount
            .checked_mul(unit.seconds())
            .map(Duration::Known)
            .ok_or_else(|| {
                TemporalError::InvalidArgument(format!("{amount} {unit}s overflows a duration"))
            })
    }

    /// Length between two instants, truncated to whole seconds.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidArgument(format!(
                "start {start} is after end {end}"
            )));
        }
        Self::from_seconds(end.timestamp() - start.timestamp())
    }

    /// Whole seconds of `delta`, rejecting negative deltas.
    pub fn from_time_delta(delta: TimeDelta) -> Result<Self, TemporalError> {
        Self::from_seconds(delta.num_seconds())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Duration::Unknown)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Duration::Known(0))
    }

    pub fn to_seconds(&self) -> Result<u64, TemporalError> {
        match self {
            Duration::Known(secs) => Ok(*secs),
            Duration::Unknown => Err(unsupported("to_seconds")),
        }
    }

    pub fn to_time_delta(&self) -> Result<TimeDelta, TemporalError> {
        let secs = self.to_seconds()?;
        i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                TemporalError::InvalidArgument(format!("{secs}s is out of the supported range"))
            })
    }

    pub fn add(self, other: Duration) -> Result<Duration, TemporalError> {
        match (self, other) {
            (Duration::Known(a), Duration::Known(b)) => {
                a.checked_add(b).map(Duration::Known).ok_or_else(|| {
                    TemporalError::InvalidArgument(format!("{a}s + {b}s overflows a duration"))
                })
            }
            _ => Ok(Duration::Unknown),
        }
    }

    /// Fails when the result would be negative.
    pub fn subtract(self, other: Duration) -> Result<Duration, TemporalError> {
        match (self, other) {
            (Duration::Known(a), Duration::Known(b)) => {
                a.checked_sub(b).map(Duration::Known).ok_or_else(|| {
                    TemporalError::InvalidArgument(format!(
                        "{a}s - {b}s would produce a negative duration"
                    ))
                })
            }
            _ => Ok(Duration::Unknown),
        }
    }

    pub fn multiply(self, factor: u32) -> Result<Duration, TemporalError> {
        match self {
            Duration::Known(secs) => secs
                .checked_mul(u64::from(factor))
                .map(Duration::Known)
                .ok_or_else(|| {
                    TemporalError::InvalidArgument(format!(
                        "{secs}s x {factor} overflows a duration"
                    ))
                }),
            Duration::Unknown => Ok(Duration::Unknown),
        }
    }

    pub fn try_cmp(&self, other: &Duration) -> Result<Ordering, TemporalError> {
        match (self, other) {
            (Duration::Known(a), Duration::Known(b)) => Ok(a.cmp(b)),
            _ => Err(unsupported("comparison")),
        }
    }

    pub fn is_longer_than(&self, other: &Duration) -> Result<bool, TemporalError> {
        Ok(self.try_cmp(other)? == Ordering::Greater)
    }

    /// Longest unit whose length does not exceed this duration.
    ///
    /// Durations shorter than a minute (including zero) report seconds.
    pub fn largest_matching_unit(&self) -> Result<TimeUnit, TemporalError> {
        let secs = self.to_seconds()?;
        let mut matching = TimeUnit::Second;
        for unit in TimeUnit::ASCENDING {
            if unit.seconds() > secs {
                break;
            }
            matching = unit;
        }
        Ok(matching)
    }

    /// Number of `unit`s, rounded half up.
    pub fn round_to(&self, unit: TimeUnit) -> Result<u64, TemporalError> {
        let secs = self.to_seconds()?;
        let step = unit.seconds();
        Ok(secs / step + u64::from(secs % step >= step.div_ceil(2)))
    }

    /// Number of whole `unit`s, remainder dropped.
    pub fn truncate_to(&self, unit: TimeUnit) -> Result<u64, TemporalError> {
        Ok(self.to_seconds()? / unit.seconds())
    }
}

fn unsupported(operation: &str) -> TemporalError {
    TemporalError::Unsupported(format!("{operation} is undefined for an unknown duration"))
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = match self {
            Duration::Unknown => return f.write_str(UNKNOWN_MARKER),
            Duration::Known(0) => return f.write_str("0s"),
            Duration::Known(secs) => *secs,
        };
        let parts = [
            (secs / TimeUnit::Day.seconds(), "d"),
            (secs % TimeUnit::Day.seconds() / TimeUnit::Hour.seconds(), "h"),
            (secs % TimeUnit::Hour.seconds() / TimeUnit::Minute.seconds(), "m"),
            (secs % TimeUnit::Minute.seconds(), "s"),
        ];
        let rendered = parts
            .iter()
            .filter(|(value, _)| *value > 0)
            .map(|(value, suffix)| format!("{value}{suffix}"))
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&rendered)
    }
}
