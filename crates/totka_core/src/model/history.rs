//! Adherence history records.
//!
//! # Invariants
//! - A `DayRecord` exists only for dates with at least one recorded dose.
//! - One `DoseEvent` per (date, medicine, time); later marks overwrite.
//! - `MedicineDayEntry::name` is a snapshot taken at recording time.

use crate::model::medicine::{DoseTime, MedicineId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whole adherence log, keyed by local calendar date (`YYYY-MM-DD`).
pub type HistoryLog = BTreeMap<NaiveDate, DayRecord>;

/// Taken status for one medicine at one time on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseEvent {
    pub taken: bool,
    /// Unix epoch milliseconds of the recording instant.
    pub timestamp: i64,
}

impl DoseEvent {
    pub fn taken_at(instant: DateTime<Utc>) -> Self {
        Self {
            taken: true,
            timestamp: instant.timestamp_millis(),
        }
    }

    /// Recording instant, when the stored timestamp is representable.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// One medicine's doses within a day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MedicineDayEntry {
    pub name: String,
    #[serde(default)]
    pub times: BTreeMap<DoseTime, DoseEvent>,
}

impl MedicineDayEntry {
    pub fn taken_count(&self) -> usize {
        self.times.values().filter(|event| event.taken).count()
    }
}

/// Adherence data for a single calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(default)]
    pub medicines: BTreeMap<MedicineId, MedicineDayEntry>,
}

impl DayRecord {
    /// Writes or overwrites one dose, creating the medicine entry on demand.
    ///
    /// The name snapshot is only taken when the entry is first created.
    pub fn record(
        &mut self,
        medicine_id: MedicineId,
        medicine_name: &str,
        time: DoseTime,
        event: DoseEvent,
    ) {
        self.medicines
            .entry(medicine_id)
            .or_insert_with(|| MedicineDayEntry {
                name: medicine_name.to_string(),
                times: BTreeMap::new(),
            })
            .times
            .insert(time, event);
    }
}
