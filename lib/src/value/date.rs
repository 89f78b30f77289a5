use std::fmt::{self, Write};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar date with an optional time of day. Dates written with a UTC
/// offset are folded into the local time they name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(NaiveDateTime);

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M %z",
];

impl Date {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Date> {
        NaiveDate::from_ymd_opt(year, month, day).map(|d| Date(d.and_time(NaiveTime::MIN)))
    }

    pub fn from_timestamp(secs: i64) -> Option<Date> {
        DateTime::from_timestamp(secs, 0).map(|dt| Date(dt.naive_utc()))
    }

    /// Parses `YYYY-MM-DD` optionally followed by a time and a UTC offset.
    ///
    /// ```rust
    /// use folio::value::Date;
    ///
    /// let date = Date::parse("2024-01-31").unwrap();
    /// assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 31));
    ///
    /// let zoned = Date::parse("2019-07-01 10:00:00 +0800").unwrap();
    /// assert_eq!(zoned.to_string(), "2019-07-01 10:00:00");
    ///
    /// assert!(Date::parse("2024-13-01").is_none());
    /// assert!(Date::parse("hello").is_none());
    /// ```
    pub fn parse(string: &str) -> Option<Date> {
        let s = string.trim();
        let bytes = s.as_bytes();
        if bytes.len() < 10 || !bytes[..4].iter().all(u8::is_ascii_digit) || bytes[4] != b'-' {
            return None;
        }

        if s.len() == 10 {
            return NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
                .map(|d| Date(d.and_time(NaiveTime::MIN)));
        }

        NAIVE_FORMATS.iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            .or_else(|| ZONED_FORMATS.iter()
                .find_map(|f| DateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.naive_local()))
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
            .map(Date)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Formats with a `strftime` string, or `None` if `fmt` is invalid.
    pub fn format(&self, fmt: &str) -> Option<String> {
        let mut string = String::new();
        write!(string, "{}", self.0.format(fmt)).ok()?;
        Some(string)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = self.0.time();
        if time == NaiveTime::MIN {
            write!(f, "{}", self.0.format("%Y-%m-%d"))
        } else if time.nanosecond() == 0 {
            write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
        } else {
            write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%.f"))
        }
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let string = String::deserialize(de)?;
        Date::parse(&string)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date `{string}`")))
    }
}
