//! Reminder use-case service: the boundary consumed by the host app.
//!
//! # Responsibility
//! - Compose registry, adherence log, history query and scheduler.
//! - Keep armed alerts in line with the medicine list on every mutation.
//! - Translate platform alert events into adherence records and re-arms.
//!
//! # Invariants
//! - Data mutations succeed or fail independently of alert scheduling.
//! - After add/edit/sync, each (medicine, time) pair has one armed alert.
//! - Deleted medicines and removed times are never re-armed.

use crate::clock::Clock;
use crate::model::alert::{AlertEvent, AlertEventKind, AlertHandle, ArmedAlert};
use crate::model::history::{DayRecord, DoseEvent};
use crate::model::medicine::{DoseTime, Medicine, MedicineId};
use crate::notify::scheduler::NotificationScheduler;
use crate::notify::AlertPlatform;
use crate::repo::document::clear_all;
use crate::repo::kv_store::{KeyValueStore, StoreResult};
use crate::service::adherence_service::{AdherenceError, AdherenceLog, TodaysMedicine};
use crate::service::history_service::{DaySummary, HistoryQuery};
use crate::service::registry_service::{MedicineRegistry, RegistryError, RegistryResult};
use chrono::NaiveDate;
use log::{error, info};
use std::collections::BTreeSet;

/// Outcome of reconciling armed alerts with the medicine list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertSyncReport {
    /// Alerts newly armed for pairs that had none.
    pub armed: usize,
    /// Orphaned or duplicate alerts cancelled.
    pub cancelled: usize,
}

pub struct ReminderService<S, P, C>
where
    S: KeyValueStore + Clone,
    P: AlertPlatform,
    C: Clock + Clone,
{
    store: S,
    registry: MedicineRegistry<S>,
    adherence: AdherenceLog<S, C>,
    history: HistoryQuery<S>,
    scheduler: NotificationScheduler<P, C>,
}

impl<S, P, C> ReminderService<S, P, C>
where
    S: KeyValueStore + Clone,
    P: AlertPlatform,
    C: Clock + Clone,
{
    pub fn new(store: S, platform: P, clock: C) -> Self {
        Self {
            registry: MedicineRegistry::new(store.clone()),
            adherence: AdherenceLog::new(store.clone(), clock.clone()),
            history: HistoryQuery::new(store.clone()),
            scheduler: NotificationScheduler::new(platform, clock),
            store,
        }
    }

    pub fn scheduler(&self) -> &NotificationScheduler<P, C> {
        &self.scheduler
    }

    pub fn list_medicines(&self) -> Vec<Medicine> {
        self.registry.list()
    }

    /// Persists a new medicine, then arms one alert per intake time.
    ///
    /// Alert failures are logged; the medicine stays saved either way.
    pub fn add_medicine<T: AsRef<str>>(&self, name: &str, times: &[T]) -> RegistryResult<Medicine> {
        let medicine = self.registry.add(name, times)?;
        let armed = medicine
            .times
            .iter()
            .filter_map(|&time| self.scheduler.schedule(medicine.id, &medicine.name, time))
            .count();
        info!(
            "event=reminder_add module=reminder status=ok medicine_id={} armed={armed}",
            medicine.id
        );
        Ok(medicine)
    }

    /// Removes a medicine and cancels all of its alerts. Idempotent.
    pub fn delete_medicine(&self, id: MedicineId) -> RegistryResult<()> {
        self.registry.delete(id)?;
        self.scheduler.cancel_all_for(id);
        Ok(())
    }

    /// Replaces intake times and reconciles alerts for the difference.
    ///
    /// Alerts for removed times are cancelled; added times are armed;
    /// unchanged times keep their current alert.
    pub fn update_medicine_times<T: AsRef<str>>(
        &self,
        id: MedicineId,
        times: &[T],
    ) -> RegistryResult<Medicine> {
        let previous = self.registry.get(id).ok_or(RegistryError::NotFound(id))?;
        let updated = self.registry.update_times(id, times)?;

        let before = previous.times.iter().copied().collect::<BTreeSet<_>>();
        let after = updated.times.iter().copied().collect::<BTreeSet<_>>();
        for &time in before.difference(&after) {
            self.scheduler.cancel_for_time(id, time);
        }
        for &time in after.difference(&before) {
            self.scheduler.schedule(id, &updated.name, time);
        }
        Ok(updated)
    }

    /// Marks a dose as taken today. `time` must be a valid `HH:MM` value.
    pub fn mark_taken(
        &self,
        id: MedicineId,
        name: &str,
        time: &str,
    ) -> Result<DoseEvent, AdherenceError> {
        let time = time.parse::<DoseTime>()?;
        self.adherence.mark_taken(id, name, time)
    }

    pub fn todays_medicines_with_status(&self) -> Vec<TodaysMedicine> {
        self.adherence.todays_medicines(self.registry.list())
    }

    pub fn history_dates(&self) -> Vec<NaiveDate> {
        self.history.all_dates_with_history()
    }

    pub fn history_for_date(&self, date: NaiveDate) -> Option<DayRecord> {
        self.history.history_for_date(date)
    }

    pub fn history_summary(&self, date: NaiveDate) -> Option<DaySummary> {
        self.history.summary_for_date(date)
    }

    /// Handles an alert reported by the platform.
    ///
    /// - `Tapped` drops the delivered alert named by `event.handle`, records
    ///   the dose under the payload's name snapshot, then makes sure the
    ///   pair stays armed for its next occurrence.
    /// - `Fired` replaces any alert of the pair with tomorrow's occurrence.
    ///
    /// Returns the handle of a newly armed alert, if any.
    pub fn handle_alert_event(&self, event: &AlertEvent) -> Option<AlertHandle> {
        let payload = &event.payload;

        if event.kind == AlertEventKind::Tapped {
            if let Some(handle) = &event.handle {
                self.release_delivered(handle);
            }
            if let Err(err) =
                self.adherence
                    .mark_taken(payload.medicine_id, &payload.medicine_name, payload.time)
            {
                error!(
                    "event=alert_tapped module=reminder status=error medicine_id={} error={err}",
                    payload.medicine_id
                );
            }
        }

        let Some(medicine) = self
            .registry
            .get(payload.medicine_id)
            .filter(|medicine| medicine.has_time(payload.time))
        else {
            info!(
                "event=alert_rearm module=reminder status=skipped reason=not_scheduled medicine_id={} time={}",
                payload.medicine_id, payload.time
            );
            return None;
        };

        match event.kind {
            AlertEventKind::Fired => {
                self.scheduler.cancel_for_time(medicine.id, payload.time);
                self.scheduler
                    .reschedule_for_next_day(medicine.id, &medicine.name, payload.time)
            }
            AlertEventKind::Tapped => {
                if self.is_armed(medicine.id, payload.time) {
                    return None;
                }
                self.scheduler
                    .schedule(medicine.id, &medicine.name, payload.time)
            }
        }
    }

    /// Converges armed alerts to exactly one per scheduled (medicine, time).
    ///
    /// Cancels alerts of deleted medicines, removed times, duplicates and
    /// alerts whose fire instant already passed, then arms every pair left
    /// without an upcoming alert.
    pub fn sync_alerts(&self) -> AlertSyncReport {
        let medicines = self.registry.list();
        let mut report = AlertSyncReport::default();
        let mut covered = BTreeSet::new();

        for alert in self.scheduler.armed() {
            let pair = (alert.payload.medicine_id, alert.payload.time);
            let scheduled = medicines
                .iter()
                .any(|medicine| medicine.id == pair.0 && medicine.has_time(pair.1));
            if scheduled && self.scheduler.is_pending(&alert) && covered.insert(pair) {
                continue;
            }
            if self.scheduler.cancel(&alert.handle) {
                report.cancelled += 1;
            }
        }

        for medicine in &medicines {
            for &time in &medicine.times {
                if covered.contains(&(medicine.id, time)) {
                    continue;
                }
                if self
                    .scheduler
                    .schedule(medicine.id, &medicine.name, time)
                    .is_some()
                {
                    report.armed += 1;
                }
            }
        }

        info!(
            "event=alert_sync module=reminder status=ok armed={} cancelled={}",
            report.armed, report.cancelled
        );
        report
    }

    /// Deletes all medicines and history and cancels every armed alert.
    pub fn factory_reset(&self) -> StoreResult<()> {
        let cancelled = self
            .scheduler
            .armed()
            .iter()
            .filter(|alert| self.scheduler.cancel(&alert.handle))
            .count();
        clear_all(&self.store)?;
        info!("event=factory_reset module=reminder status=ok cancelled={cancelled}");
        Ok(())
    }

    fn is_armed(&self, id: MedicineId, time: DoseTime) -> bool {
        self.scheduler
            .upcoming()
            .iter()
            .any(|ArmedAlert { payload, .. }| payload.medicine_id == id && payload.time == time)
    }

    fn release_delivered(&self, handle: &AlertHandle) {
        if self
            .scheduler
            .armed()
            .iter()
            .any(|alert| alert.handle == *handle)
        {
            self.scheduler.cancel(handle);
        }
    }
}
