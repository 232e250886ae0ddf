//! Notification scheduler for (medicine, time) pairs.
//!
//! Per pair the lifecycle is `Unscheduled -> Armed -> Fired -> Armed`, with
//! `Armed -> Unscheduled` on cancel. Alerts never repeat natively; the next
//! day's alert is armed when the platform reports the current one.
//!
//! # Invariants
//! - Fire instants carry zero seconds and match the dose time in local time.
//! - The scheduler does not deduplicate; callers cancel before re-arming.

use crate::clock::Clock;
use crate::model::alert::{AlertContent, AlertHandle, AlertPayload, ArmedAlert};
use crate::model::medicine::{DoseTime, MedicineId};
use crate::notify::AlertPlatform;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};
use log::{error, info, warn};

/// Next instant strictly after `now` whose local wall time equals `time`.
///
/// Today's occurrence when it is still ahead, tomorrow's otherwise.
pub fn next_fire_at<Tz: TimeZone>(now: &DateTime<Tz>, time: DoseTime) -> DateTime<Tz> {
    let today = now.date_naive();
    let candidate = at_wall_time(&now.timezone(), today, time.to_naive_time());
    if candidate > *now {
        return candidate;
    }
    at_wall_time(&now.timezone(), next_date(today), time.to_naive_time())
}

/// Tomorrow's occurrence of `time`, regardless of today's.
pub fn next_day_fire_at<Tz: TimeZone>(now: &DateTime<Tz>, time: DoseTime) -> DateTime<Tz> {
    at_wall_time(
        &now.timezone(),
        next_date(now.date_naive()),
        time.to_naive_time(),
    )
}

/// Whole seconds from `now` until `target`, floored and clamped at zero.
pub fn delay_seconds<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> u64 {
    let seconds = target
        .clone()
        .signed_duration_since(now.clone())
        .num_seconds();
    u64::try_from(seconds).unwrap_or(0)
}

fn next_date(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

// Gap times (spring forward) shift one hour later; ambiguous times
// (fall back) take the earlier instant.
fn at_wall_time<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

pub struct NotificationScheduler<P: AlertPlatform, C: Clock> {
    platform: P,
    clock: C,
}

impl<P: AlertPlatform, C: Clock> NotificationScheduler<P, C> {
    pub fn new(platform: P, clock: C) -> Self {
        Self { platform, clock }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Arms the next occurrence of `time` (today or tomorrow).
    ///
    /// Returns `None` when the platform refused; the failure is logged.
    pub fn schedule(
        &self,
        medicine_id: MedicineId,
        medicine_name: &str,
        time: DoseTime,
    ) -> Option<AlertHandle> {
        let now = self.clock.now();
        let target = next_fire_at(&now, time);
        self.arm("alert_schedule", &now, &target, medicine_id, medicine_name, time)
    }

    /// Arms tomorrow's occurrence after the current alert fired or was tapped.
    pub fn reschedule_for_next_day(
        &self,
        medicine_id: MedicineId,
        medicine_name: &str,
        time: DoseTime,
    ) -> Option<AlertHandle> {
        let now = self.clock.now();
        let target = next_day_fire_at(&now, time);
        self.arm("alert_reschedule", &now, &target, medicine_id, medicine_name, time)
    }

    /// Cancels one alert. Returns whether the platform accepted the cancel.
    pub fn cancel(&self, handle: &AlertHandle) -> bool {
        match self.platform.cancel(handle) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=alert_cancel module=scheduler status=error handle={handle} error={err}"
                );
                false
            }
        }
    }

    /// Cancels every armed alert whose payload names `medicine_id`.
    ///
    /// There is no index from medicine to handles; this scans all alerts.
    pub fn cancel_all_for(&self, medicine_id: MedicineId) -> usize {
        self.cancel_matching(medicine_id, |_| true)
    }

    /// Cancels armed alerts for one (medicine, time) pair.
    pub fn cancel_for_time(&self, medicine_id: MedicineId, time: DoseTime) -> usize {
        self.cancel_matching(medicine_id, |payload| payload.time == time)
    }

    /// Armed alerts as reported by the platform; empty when enumeration fails.
    pub fn armed(&self) -> Vec<ArmedAlert> {
        self.platform.list_armed().unwrap_or_else(|err| {
            error!("event=alert_list module=scheduler status=error error={err}");
            Vec::new()
        })
    }

    /// Whether `alert` is still ahead of the clock.
    ///
    /// A delivered one-shot can linger in `armed()` when the host never
    /// reported it; such an alert no longer covers its pair.
    pub fn is_pending(&self, alert: &ArmedAlert) -> bool {
        alert.payload.scheduled_time > self.clock.now().timestamp_millis()
    }

    /// Armed alerts that have not fired yet.
    pub fn upcoming(&self) -> Vec<ArmedAlert> {
        self.armed()
            .into_iter()
            .filter(|alert| self.is_pending(alert))
            .collect()
    }

    fn cancel_matching(
        &self,
        medicine_id: MedicineId,
        filter: impl Fn(&AlertPayload) -> bool,
    ) -> usize {
        let cancelled = self
            .armed()
            .into_iter()
            .filter(|alert| alert.payload.medicine_id == medicine_id && filter(&alert.payload))
            .filter(|alert| self.cancel(&alert.handle))
            .count();
        info!(
            "event=alert_cancel_all module=scheduler status=ok medicine_id={medicine_id} cancelled={cancelled}"
        );
        cancelled
    }

    fn arm(
        &self,
        event: &str,
        now: &DateTime<Local>,
        target: &DateTime<Local>,
        medicine_id: MedicineId,
        medicine_name: &str,
        time: DoseTime,
    ) -> Option<AlertHandle> {
        let delay = delay_seconds(now, target);
        let payload = AlertPayload {
            medicine_id,
            medicine_name: medicine_name.to_string(),
            time,
            scheduled_time: target.timestamp_millis(),
        };
        let content = AlertContent::reminder_for(medicine_name);

        match self.platform.arm_one_shot(delay, &content, &payload) {
            Ok(handle) => {
                info!(
                    "event={event} module=scheduler status=ok medicine_id={medicine_id} time={time} delay_s={delay} handle={handle}"
                );
                Some(handle)
            }
            Err(err) => {
                warn!(
                    "event={event} module=scheduler status=error medicine_id={medicine_id} time={time} error={err}"
                );
                None
            }
        }
    }
}
