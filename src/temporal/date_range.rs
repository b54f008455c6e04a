use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Duration, TemporalError};

/// Closed interval `[start, end]` with `start <= end`.
///
/// Equality ignores sub-second differences. Two ranges that only share an
/// endpoint do not intersect, so consecutive jobs in a slot may abut.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "DateRangeRepr", into = "DateRangeRepr")]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct DateRangeRepr {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<DateRangeRepr> for DateRange {
    type Error = TemporalError;

    fn try_from(value: DateRangeRepr) -> Result<Self, Self::Error> {
        DateRange::new(value.start, value.end)
    }
}

impl From<DateRange> for DateRangeRepr {
    fn from(value: DateRange) -> Self {
        DateRangeRepr {
            start: value.start,
            end: value.end,
        }
    }
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidArgument(format!(
                "range start {start} is after its end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Result<Self, TemporalError> {
        let end = start
            .checked_add_signed(duration.to_time_delta()?)
            .ok_or_else(|| {
                TemporalError::InvalidArgument(format!(
                    "{start} + {duration} is beyond the supported date range"
                ))
            })?;
        Self::new(start, end)
    }

    /// The whole UTC calendar day `[00:00, next 00:00]`.
    pub fn day(date: NaiveDate) -> Result<Self, TemporalError> {
        let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        Self::starting_at(start, Duration::days(1))
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.len_seconds())
    }

    fn len_seconds(&self) -> u64 {
        u64::try_from(self.end.timestamp() - self.start.timestamp()).unwrap_or(0)
    }

    /// True when the ranges share more than an endpoint.
    pub fn intersects(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `instant` falls in `[start, end)`; an empty range holds only
    /// its start.
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        if self.start == self.end {
            return instant == self.start;
        }
        self.start <= instant && instant < self.end
    }

    pub fn contains_range(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The shared part of two ranges, if they intersect.
    pub fn overlap(&self, other: &DateRange) -> Option<DateRange> {
        if !self.intersects(other) {
            return None;
        }
        Some(DateRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// The same range moved by `delta`.
    pub fn shifted(&self, delta: TimeDelta) -> Result<DateRange, TemporalError> {
        let start = self.start.checked_add_signed(delta);
        let end = self.end.checked_add_signed(delta);
        match (start, end) {
            (Some(start), Some(end)) => Ok(DateRange { start, end }),
            _ => Err(TemporalError::InvalidArgument(format!(
                "shifting {self} by {delta} leaves the supported date range"
            ))),
        }
    }
}

impl PartialEq for DateRange {
    fn eq(&self, other: &Self) -> bool {
        self.start.timestamp() == other.start.timestamp()
            && self.end.timestamp() == other.end.timestamp()
    }
}

impl Eq for DateRange {}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
