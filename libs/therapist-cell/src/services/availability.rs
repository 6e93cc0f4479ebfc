use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub const UNAVAILABLE: &str = "unavailable";

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityParseError {
    #[error("expected \"H-H\" or \"unavailable\", got {0:?}")]
    MissingSeparator(String),

    #[error("invalid hour {0:?}")]
    InvalidHour(String),

    #[error("range {start}-{end} is empty or runs past midnight")]
    InvalidRange { start: u32, end: u32 },

    #[error("unknown weekday {0:?}")]
    UnknownWeekday(String),
}

/// Lowercase English day name used as the storage key.
pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn parse_weekday_key(key: &str) -> Option<Weekday> {
    WEEKDAYS.iter().copied().find(|day| weekday_key(*day) == key)
}

/// Calendar day of a stored offline date. Both `2024-05-01` and full ISO
/// timestamps are accepted; only the date prefix is looked at so a UTC offset
/// in the stored value can never shift the day.
pub fn calendar_day(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// `date` at `hour:00` on the stored clock. `hour` may be 24. `None` when the
/// instant falls past the last representable date.
pub fn at_hour(date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
    start_of_day(date).checked_add_signed(Duration::hours(i64::from(hour)))
}

/// Open hours of a single weekday, `[start_hour, end_hour)`, after the
/// 12-hour adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenInterval {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl OpenInterval {
    /// Parses a stored `"H-H"` value. `Ok(None)` means the day is unavailable.
    ///
    /// An end hour smaller than the start hour is read as an afternoon hour
    /// written on a 12-hour clock, so `"9-5"` opens 09:00-17:00. Anything that
    /// still is not `start < end <= 24` after that is an error.
    pub fn parse(raw: &str) -> Result<Option<Self>, AvailabilityParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNAVAILABLE) {
            return Ok(None);
        }

        let (start, end) = trimmed
            .split_once('-')
            .ok_or_else(|| AvailabilityParseError::MissingSeparator(raw.to_string()))?;

        let start_hour = parse_hour(start)?;
        let mut end_hour = parse_hour(end)?;

        if end_hour < start_hour {
            end_hour = end_hour
                .checked_add(12)
                .ok_or(AvailabilityParseError::InvalidRange { start: start_hour, end: end_hour })?;
        }

        if start_hour >= end_hour || end_hour > 24 {
            return Err(AvailabilityParseError::InvalidRange { start: start_hour, end: end_hour });
        }

        Ok(Some(Self { start_hour, end_hour }))
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }

    pub fn hours(&self) -> Range<u32> {
        self.start_hour..self.end_hour
    }

    pub fn start_on(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        at_hour(date, self.start_hour)
    }

    pub fn end_on(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        at_hour(date, self.end_hour)
    }
}

fn parse_hour(raw: &str) -> Result<u32, AvailabilityParseError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| AvailabilityParseError::InvalidHour(raw.to_string()))
}

/// Checks a full weekly mapping before it is written back to storage.
pub fn validate_available_hours(
    hours: &BTreeMap<String, String>,
) -> Result<(), AvailabilityParseError> {
    for (key, value) in hours {
        if parse_weekday_key(key).is_none() {
            return Err(AvailabilityParseError::UnknownWeekday(key.clone()));
        }
        OpenInterval::parse(value)?;
    }
    Ok(())
}

/// Read model over a therapist's weekly hours and closed dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityModel {
    // Indexed by `Weekday::num_days_from_monday`.
    days: [Option<OpenInterval>; 7],
    offline_dates: BTreeSet<NaiveDate>,
}

impl AvailabilityModel {
    pub fn new(
        days: impl IntoIterator<Item = (Weekday, OpenInterval)>,
        offline_dates: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        let mut model = Self::default();
        for (weekday, interval) in days {
            model.days[weekday.num_days_from_monday() as usize] = Some(interval);
        }
        model.offline_dates.extend(offline_dates);
        model
    }

    /// Builds the model from stored values. Bad entries never fail the build:
    /// a malformed day is unavailable and a malformed date is skipped.
    pub fn from_raw<S: AsRef<str>>(hours: &BTreeMap<String, String>, offline_dates: &[S]) -> Self {
        let mut model = Self::default();
        for (key, value) in hours {
            model.set_day(key, value);
        }
        model.add_raw_offline_dates(offline_dates);
        model
    }

    /// Same as [`Self::from_raw`] over the JSON values of a stored row. A day
    /// whose value is not a string (`null`, a number, an object) is unavailable.
    pub fn from_stored<S: AsRef<str>>(hours: &BTreeMap<String, Value>, offline_dates: &[S]) -> Self {
        let mut model = Self::default();
        for (key, value) in hours {
            match value.as_str() {
                Some(raw) => model.set_day(key, raw),
                None => warn!("Treating {} as unavailable: expected \"H-H\", got {}", key, value),
            }
        }
        model.add_raw_offline_dates(offline_dates);
        model
    }

    fn set_day(&mut self, key: &str, raw: &str) {
        let Some(weekday) = parse_weekday_key(key) else {
            warn!("Ignoring availability for unknown weekday {:?}", key);
            return;
        };
        match OpenInterval::parse(raw) {
            Ok(interval) => self.days[weekday.num_days_from_monday() as usize] = interval,
            Err(e) => warn!("Treating {} as unavailable: {}", key, e),
        }
    }

    fn add_raw_offline_dates<S: AsRef<str>>(&mut self, offline_dates: &[S]) {
        for raw in offline_dates {
            match calendar_day(raw.as_ref()) {
                Some(day) => {
                    self.offline_dates.insert(day);
                }
                None => warn!("Ignoring malformed offline date {:?}", raw.as_ref()),
            }
        }
    }

    /// Adds further closures, e.g. clinic-wide ones.
    pub fn with_offline_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.offline_dates.extend(dates);
        self
    }

    pub fn open_interval(&self, weekday: Weekday) -> Option<OpenInterval> {
        self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn is_open(&self, weekday: Weekday, hour: u32) -> bool {
        self.open_interval(weekday)
            .is_some_and(|interval| interval.contains_hour(hour))
    }

    pub fn is_closed(&self, date: NaiveDate) -> bool {
        self.offline_dates.contains(&date)
    }

    /// Open interval for a concrete date, `None` when closed or unavailable.
    pub fn interval_on(&self, date: NaiveDate) -> Option<OpenInterval> {
        if self.is_closed(date) {
            return None;
        }
        self.open_interval(date.weekday())
    }

    pub fn offline_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.offline_dates.iter().copied()
    }
}
