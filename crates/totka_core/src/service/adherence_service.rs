//! Adherence log: records taken doses and derives today's view.
//!
//! # Invariants
//! - "Today" always comes from the injected clock's local date.
//! - Marking a time outside the medicine's current schedule is accepted;
//!   history is decoupled from the live schedule.
//! - Only the history document is written; medicines are never mutated.

use crate::clock::Clock;
use crate::model::history::{DayRecord, DoseEvent};
use crate::model::medicine::{DoseTime, Medicine, MedicineId, ValidationError};
use crate::repo::document::{load_history, save_history};
use crate::repo::kv_store::{KeyValueStore, StoreError};
use crate::service::history_service::HistoryQuery;
use chrono::{NaiveDate, Utc};
use log::info;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum AdherenceError {
    Validation(ValidationError),
    Storage(StoreError),
}

impl Display for AdherenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AdherenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<ValidationError> for AdherenceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for AdherenceError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

/// Read-only view of one medicine joined with today's doses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodaysMedicine {
    pub medicine: Medicine,
    pub todays_status: BTreeMap<DoseTime, DoseEvent>,
}

impl TodaysMedicine {
    pub fn is_taken(&self, time: DoseTime) -> bool {
        self.todays_status
            .get(&time)
            .is_some_and(|event| event.taken)
    }
}

pub struct AdherenceLog<S: KeyValueStore, C: Clock> {
    store: S,
    clock: C,
}

impl<S: KeyValueStore, C: Clock> AdherenceLog<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Marks one dose as taken today, overwriting any earlier mark.
    ///
    /// `medicine_name` is stored as the day's snapshot when the medicine has
    /// no entry for today yet.
    pub fn mark_taken(
        &self,
        medicine_id: MedicineId,
        medicine_name: &str,
        time: DoseTime,
    ) -> Result<DoseEvent, AdherenceError> {
        let now = self.clock.now();
        let today = now.date_naive();
        let event = DoseEvent::taken_at(now.with_timezone(&Utc));

        let mut history = load_history(&self.store);
        history
            .entry(today)
            .or_default()
            .record(medicine_id, medicine_name, time, event);
        save_history(&self.store, &history)?;

        info!(
            "event=dose_mark_taken module=adherence status=ok medicine_id={medicine_id} time={time} date={today}"
        );
        Ok(event)
    }

    /// Today's recorded doses for one medicine; empty when none.
    pub fn todays_status(&self, medicine_id: MedicineId) -> BTreeMap<DoseTime, DoseEvent> {
        let today = self.clock.today();
        load_history(&self.store)
            .remove(&today)
            .and_then(|mut day| day.medicines.remove(&medicine_id))
            .map(|entry| entry.times)
            .unwrap_or_default()
    }

    /// Joins `medicines` with today's record, preserving input order.
    pub fn todays_medicines(&self, medicines: Vec<Medicine>) -> Vec<TodaysMedicine> {
        let today = self.clock.today();
        let mut day = load_history(&self.store)
            .remove(&today)
            .unwrap_or_default();

        medicines
            .into_iter()
            .map(|medicine| {
                let todays_status = day
                    .medicines
                    .remove(&medicine.id)
                    .map(|entry| entry.times)
                    .unwrap_or_default();
                TodaysMedicine {
                    medicine,
                    todays_status,
                }
            })
            .collect()
    }

    pub fn history_for_date(&self, date: NaiveDate) -> Option<DayRecord> {
        HistoryQuery::new(&self.store).history_for_date(date)
    }

    /// Dates with at least one record, most recent first.
    pub fn all_dates_with_history(&self) -> Vec<NaiveDate> {
        HistoryQuery::new(&self.store).all_dates_with_history()
    }
}
