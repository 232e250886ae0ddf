//! Medicine domain model and dose-time normalization.
//!
//! # Responsibility
//! - Define the persisted `Medicine` record.
//! - Parse, validate and normalize `HH:MM` intake times.
//!
//! # Invariants
//! - `Medicine::times` is non-empty, deduplicated and sorted ascending.
//! - `DoseTime` always renders zero-padded, so text order equals clock order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

static DOSE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01]?[0-9]|2[0-3]):([0-5][0-9])$").expect("valid dose time regex")
});

/// Stable medicine identifier.
///
/// UUID v7 keeps ids unique while ordering them by creation time.
pub type MedicineId = Uuid;

/// Validation failures raised before any mutation happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty or whitespace-only.
    EmptyName,
    /// None of the supplied times is a valid `HH:MM` value.
    NoValidTimes,
    /// A single time value failed to parse.
    InvalidTime(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "medicine name must not be empty"),
            Self::NoValidTimes => write!(f, "no valid times"),
            Self::InvalidTime(value) => write!(f, "invalid time `{value}`; expected HH:MM"),
        }
    }
}

impl Error for ValidationError {}

/// Wall-clock intake time (hour 0-23, minute 0-59).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DoseTime {
    hour: u8,
    minute: u8,
}

impl DoseTime {
    /// Builds a time from components, rejecting out-of-range values.
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    /// Converts into a `chrono` time with zero seconds.
    pub fn to_naive_time(self) -> chrono::NaiveTime {
        chrono::NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(chrono::NaiveTime::MIN)
    }
}

impl FromStr for DoseTime {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = || ValidationError::InvalidTime(trimmed.to_string());
        let caps = DOSE_TIME_RE.captures(trimmed).ok_or_else(invalid)?;
        let hour = caps[1].parse::<u8>().map_err(|_| invalid())?;
        let minute = caps[2].parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl Display for DoseTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for DoseTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DoseTime> for String {
    fn from(value: DoseTime) -> Self {
        value.to_string()
    }
}

/// Filters raw inputs down to valid, deduplicated, ascending dose times.
///
/// Invalid entries are dropped silently; an empty result is an error.
pub fn normalize_times<S: AsRef<str>>(raw_times: &[S]) -> Result<Vec<DoseTime>, ValidationError> {
    let times = raw_times
        .iter()
        .filter_map(|raw| raw.as_ref().parse::<DoseTime>().ok())
        .collect::<BTreeSet<_>>();

    if times.is_empty() {
        return Err(ValidationError::NoValidTimes);
    }
    Ok(times.into_iter().collect())
}

/// Persisted medicine record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub times: Vec<DoseTime>,
}

impl Medicine {
    /// Validates input and creates a medicine with a fresh id.
    pub fn new<S: AsRef<str>>(name: &str, raw_times: &[S]) -> Result<Self, ValidationError> {
        let name = normalize_name(name)?;
        let times = normalize_times(raw_times)?;
        Ok(Self {
            id: Uuid::now_v7(),
            name,
            times,
        })
    }

    /// Returns whether `time` is part of the active schedule.
    pub fn has_time(&self, time: DoseTime) -> bool {
        self.times.binary_search(&time).is_ok()
    }
}

fn normalize_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}
