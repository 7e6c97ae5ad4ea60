//! Structural identity of a timetable cell.
//!
//! The backend hands slot identities out in two shapes: a flat
//! `"DAY-HH:MM-HH:MM"` string and a nested `{day, start_time, end_time}`
//! object, the latter sometimes with seconds. Both decode into the same
//! [`SlotKey`] value, and cells are matched on that value only.

use super::error::{TimetableError, TimetableResult};
use chrono::{NaiveTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static FLAT_SLOT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z]+)\s*[-–]\s*(\d{1,2}:\d{2}(?::\d{2})?)\s*[-–]\s*(\d{1,2}:\d{2}(?::\d{2})?)\s*$")
        .unwrap()
});

/// Teaching day. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Day {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Day {
    pub const ALL: [Day; 6] = [Day::Sun, Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri];

    /// Three-letter upper-case code used on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Day::Sun => "SUN",
            Day::Mon => "MON",
            Day::Tue => "TUE",
            Day::Wed => "WED",
            Day::Thu => "THU",
            Day::Fri => "FRI",
        }
    }
}

impl FromStr for Day {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let day = match lower.as_str() {
            "sun" | "sunday" => Day::Sun,
            "mon" | "monday" => Day::Mon,
            "tue" | "tues" | "tuesday" => Day::Tue,
            "wed" | "wednesday" => Day::Wed,
            "thu" | "thur" | "thurs" | "thursday" => Day::Thu,
            "fri" | "friday" => Day::Fri,
            _ => {
                return Err(TimetableError::InvalidSlot {
                    input: s.to_string(),
                    reason: "unknown teaching day".to_string(),
                })
            }
        };
        Ok(day)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Day {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Day {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses `HH:MM` or `HH:MM:SS` into a wall-clock time.
pub fn parse_time(input: &str) -> TimetableResult<NaiveTime> {
    let invalid = |reason: &str| TimetableError::InvalidSlot {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = input.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(invalid("expected HH:MM or HH:MM:SS"));
    }

    let mut fields = [0u32; 3];
    for (field, part) in fields.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("time components must be numeric"));
        }
        *field = part.parse().map_err(|_| invalid("time component out of range"))?;
    }

    NaiveTime::from_hms_opt(fields[0], fields[1], fields[2])
        .ok_or_else(|| invalid("time component out of range"))
}

/// Formats a time as `HH:MM`, keeping seconds only when they are non-zero.
pub fn format_time(time: NaiveTime) -> String {
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

/// A (start, end) pair of wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(rename = "start_time", with = "wall_clock")]
    pub start: NaiveTime,
    #[serde(rename = "end_time", with = "wall_clock")]
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Creates a slot, rejecting ones that do not end after they start.
    pub fn new(start: NaiveTime, end: NaiveTime) -> TimetableResult<Self> {
        if end <= start {
            return Err(TimetableError::InvalidSlot {
                input: format!("{}-{}", format_time(start), format_time(end)),
                reason: "slot must end after it starts".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates a slot from `HH:MM[:SS]` strings.
    pub fn parse(start: &str, end: &str) -> TimetableResult<Self> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", format_time(self.start), format_time(self.end))
    }
}

/// Serde adapter for `HH:MM[:SS]` strings.
mod wall_clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

/// The nested slot shape: `{"day": "MON", "start_time": "16:15:00", "end_time": "17:55:00"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDetail {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

/// Identity of a grid cell, compared field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub day: Day,
    pub time: TimeSlot,
}

impl SlotKey {
    pub fn new(day: Day, time: TimeSlot) -> Self {
        Self { day, time }
    }

    /// Decodes the flat `"DAY-HH:MM-HH:MM"` shape.
    pub fn parse_flat(input: &str) -> TimetableResult<Self> {
        let caps = FLAT_SLOT_REGEX
            .captures(input)
            .ok_or_else(|| TimetableError::InvalidSlot {
                input: input.to_string(),
                reason: "expected DAY-HH:MM-HH:MM".to_string(),
            })?;

        Self::from_parts(&caps[1], &caps[2], &caps[3])
    }

    /// Decodes the nested `{day, start_time, end_time}` shape.
    pub fn from_detail(detail: &SlotDetail) -> TimetableResult<Self> {
        Self::from_parts(&detail.day, &detail.start_time, &detail.end_time)
    }

    fn from_parts(day: &str, start: &str, end: &str) -> TimetableResult<Self> {
        Ok(Self {
            day: day.parse()?,
            time: TimeSlot::parse(start, end)?,
        })
    }

    /// The flat wire form the backend stores, e.g. `MON-16:15-17:55`.
    pub fn to_wire(&self) -> String {
        format!(
            "{}-{}-{}",
            self.day,
            format_time(self.time.start),
            format_time(self.time.end)
        )
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for SlotKey {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_flat(s)
    }
}
