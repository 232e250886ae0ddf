//! Read-only history projections for the history screen.

use crate::model::history::DayRecord;
use crate::repo::document::load_history;
use crate::repo::kv_store::KeyValueStore;
use chrono::NaiveDate;

/// Counts shown in a collapsed history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub medicine_count: usize,
    pub taken_count: usize,
}

pub struct HistoryQuery<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> HistoryQuery<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Dates with recorded doses, most recent first.
    pub fn all_dates_with_history(&self) -> Vec<NaiveDate> {
        load_history(&self.store).into_keys().rev().collect()
    }

    pub fn history_for_date(&self, date: NaiveDate) -> Option<DayRecord> {
        load_history(&self.store).remove(&date)
    }

    pub fn summary_for_date(&self, date: NaiveDate) -> Option<DaySummary> {
        self.history_for_date(date).map(|day| DaySummary {
            date,
            medicine_count: day.medicines.len(),
            taken_count: day.medicines.values().map(|entry| entry.taken_count()).sum(),
        })
    }
}
