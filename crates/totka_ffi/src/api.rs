//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the reminder use-cases to Dart via FRB.
//! - Bridge the host's notification plugin through a queued alert platform.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are reported in response envelopes, never thrown.
//! - Store calls are serialized process-wide.
//! - After any call that may touch alerts, the host drains
//!   `alerts_take_pending` and applies the commands in order.

use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};
use totka_core::db::open_db;
use totka_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, resolve_db_path,
    AlertCommand, AlertEvent, AlertEventKind, AlertHandle, AlertPayload, ArmedAlert, DayRecord,
    LoggingConfig, Medicine, MedicineId, QueuedAlertPlatform, ReminderService,
    SqliteKeyValueStore, SystemClock, TodaysMedicine,
};

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static ALERTS: Lazy<QueuedAlertPlatform> = Lazy::new(QueuedAlertPlatform::new);
// One load-mutate-save cycle at a time across host threads.
static CALL_LOCK: Mutex<()> = Mutex::new(());

type HostService<'conn> =
    ReminderService<SqliteKeyValueStore<'conn>, &'static QueuedAlertPlatform, SystemClock>;

/// Exposes the core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Returns an empty string on success and an error message otherwise.
/// Repeating the same `level + log_dir` is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match LoggingConfig::parse(&level, &log_dir).and_then(|config| init_logging_inner(&config)) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Pins the store database path for this process.
///
/// Must be called before the first data call. Returns an empty string on
/// success; a different path after the first call is rejected.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(path: String) -> String {
    let requested = resolve_db_path(Some(path.as_str()));
    let active = DB_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!(
            "store already configured at `{}`; refusing to switch",
            active.display()
        )
    }
}

/// Medicine row for list screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicineItem {
    pub id: String,
    pub name: String,
    /// Zero-padded `HH:MM`, ascending.
    pub times: Vec<String>,
}

/// One dose slot in today's view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayDose {
    pub time: String,
    pub taken: bool,
    /// Epoch milliseconds of the mark, when taken.
    pub taken_at_ms: Option<i64>,
}

/// Medicine joined with today's doses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayItem {
    pub id: String,
    pub name: String,
    pub doses: Vec<TodayDose>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryDose {
    pub time: String,
    pub taken: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMedicine {
    pub medicine_id: String,
    /// Name as recorded on that day.
    pub name: String,
    pub doses: Vec<HistoryDose>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryDay {
    pub date: String,
    pub medicines: Vec<HistoryMedicine>,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub medicine: Option<MedicineItem>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, medicine: Option<MedicineItem>) -> Self {
        Self {
            ok: true,
            medicine,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            medicine: None,
            message: message.into(),
        }
    }
}

/// Notification instruction for the host plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertCommandItem {
    /// `arm` or `cancel`.
    pub kind: String,
    /// Identifier to use with the OS notification API.
    pub handle: String,
    pub delay_seconds: Option<u64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub sound: Option<String>,
    /// JSON payload to attach as notification data.
    pub payload_json: Option<String>,
}

/// Alert the host reports as still pending in the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedAlertItem {
    pub handle: String,
    pub payload_json: String,
}

#[flutter_rust_bridge::frb(sync)]
pub fn medicines_list() -> Vec<MedicineItem> {
    with_service(|service| service.list_medicines().iter().map(to_medicine_item).collect())
        .unwrap_or_default()
}

/// Adds a medicine and arms its reminders.
#[flutter_rust_bridge::frb(sync)]
pub fn medicine_add(name: String, times: Vec<String>) -> ActionResponse {
    let result = with_service(|service| {
        service
            .add_medicine(&name, &times)
            .map_err(|err| err.to_string())
    })
    .and_then(|inner| inner);
    match result {
        Ok(medicine) => {
            ActionResponse::success("Medicine added.", Some(to_medicine_item(&medicine)))
        }
        Err(err) => ActionResponse::failure(format!("medicine_add failed: {err}")),
    }
}

/// Deletes a medicine and cancels its reminders. Unknown ids succeed.
#[flutter_rust_bridge::frb(sync)]
pub fn medicine_delete(id: String) -> ActionResponse {
    let result = parse_medicine_id(&id).and_then(|id| {
        with_service(|service| service.delete_medicine(id).map_err(|err| err.to_string()))
            .and_then(|inner| inner)
    });
    match result {
        Ok(()) => ActionResponse::success("Medicine deleted.", None),
        Err(err) => ActionResponse::failure(format!("medicine_delete failed: {err}")),
    }
}

/// Replaces intake times and reconciles reminders.
#[flutter_rust_bridge::frb(sync)]
pub fn medicine_update_times(id: String, times: Vec<String>) -> ActionResponse {
    let result = parse_medicine_id(&id).and_then(|id| {
        with_service(|service| {
            service
                .update_medicine_times(id, &times)
                .map_err(|err| err.to_string())
        })
        .and_then(|inner| inner)
    });
    match result {
        Ok(medicine) => {
            ActionResponse::success("Medicine updated.", Some(to_medicine_item(&medicine)))
        }
        Err(err) => ActionResponse::failure(format!("medicine_update_times failed: {err}")),
    }
}

/// Marks one dose as taken today.
#[flutter_rust_bridge::frb(sync)]
pub fn dose_mark_taken(id: String, name: String, time: String) -> ActionResponse {
    let result = parse_medicine_id(&id).and_then(|id| {
        with_service(|service| {
            service
                .mark_taken(id, &name, &time)
                .map_err(|err| err.to_string())
        })
        .and_then(|inner| inner)
    });
    match result {
        Ok(_) => ActionResponse::success(format!("{name} marked as taken at {time}."), None),
        Err(err) => ActionResponse::failure(format!("dose_mark_taken failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn today_list() -> Vec<TodayItem> {
    with_service(|service| {
        service
            .todays_medicines_with_status()
            .iter()
            .map(to_today_item)
            .collect()
    })
    .unwrap_or_default()
}

/// Dates with history as `YYYY-MM-DD`, most recent first.
#[flutter_rust_bridge::frb(sync)]
pub fn history_dates() -> Vec<String> {
    with_service(|service| {
        service
            .history_dates()
            .iter()
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// One day's history; `None` for unknown or malformed dates.
#[flutter_rust_bridge::frb(sync)]
pub fn history_for_date(date: String) -> Option<HistoryDay> {
    let parsed = chrono::NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    with_service(|service| service.history_for_date(parsed))
        .ok()
        .flatten()
        .map(|day| to_history_day(parsed, day))
}

/// Drains notification commands issued since the last drain.
#[flutter_rust_bridge::frb(sync)]
pub fn alerts_take_pending() -> Vec<AlertCommandItem> {
    match ALERTS.take_pending() {
        Ok(commands) => commands.into_iter().filter_map(to_alert_command_item).collect(),
        Err(err) => {
            log::error!("event=alerts_take_pending module=ffi status=error error={err}");
            Vec::new()
        }
    }
}

/// Seeds the armed-alert mirror from the OS after a process start.
///
/// Items with undecodable payloads are skipped; the count kept is returned
/// in the message.
#[flutter_rust_bridge::frb(sync)]
pub fn alerts_restore_armed(items: Vec<ArmedAlertItem>) -> ActionResponse {
    let alerts = items
        .into_iter()
        .filter_map(|item| {
            AlertPayload::from_json(&item.payload_json)
                .ok()
                .map(|payload| ArmedAlert {
                    handle: AlertHandle(item.handle),
                    payload,
                })
        })
        .collect::<Vec<_>>();
    let kept = alerts.len();
    match ALERTS.restore_armed(alerts) {
        Ok(()) => ActionResponse::success(format!("Restored {kept} alert(s)."), None),
        Err(err) => ActionResponse::failure(format!("alerts_restore_armed failed: {err}")),
    }
}

/// Reports a delivered notification. Re-arms tomorrow's reminder.
#[flutter_rust_bridge::frb(sync)]
pub fn alerts_on_fired(handle: Option<String>, payload_json: String) -> ActionResponse {
    handle_alert(AlertEventKind::Fired, handle, &payload_json)
}

/// Reports a tapped notification. Records the dose and keeps the pair armed.
#[flutter_rust_bridge::frb(sync)]
pub fn alerts_on_tapped(handle: Option<String>, payload_json: String) -> ActionResponse {
    handle_alert(AlertEventKind::Tapped, handle, &payload_json)
}

/// Reconciles armed reminders with the medicine list.
#[flutter_rust_bridge::frb(sync)]
pub fn alerts_sync() -> ActionResponse {
    match with_service(|service| service.sync_alerts()) {
        Ok(report) => ActionResponse::success(
            format!(
                "Armed {} and cancelled {} alert(s).",
                report.armed, report.cancelled
            ),
            None,
        ),
        Err(err) => ActionResponse::failure(format!("alerts_sync failed: {err}")),
    }
}

/// Deletes all medicines and history and cancels every reminder.
#[flutter_rust_bridge::frb(sync)]
pub fn factory_reset() -> ActionResponse {
    let result = with_service(|service| {
        service.factory_reset().map_err(|err| err.to_string())
    })
    .and_then(|inner| inner);
    match result {
        Ok(()) => ActionResponse::success("All data has been cleared.", None),
        Err(err) => ActionResponse::failure(format!("factory_reset failed: {err}")),
    }
}

fn handle_alert(
    kind: AlertEventKind,
    handle: Option<String>,
    payload_json: &str,
) -> ActionResponse {
    let payload = match AlertPayload::from_json(payload_json) {
        Ok(payload) => payload,
        Err(err) => {
            return ActionResponse::failure(format!("invalid alert payload: {err}"));
        }
    };
    // Fired and tapped both mean the OS already delivered this one-shot.
    let handle = handle.map(AlertHandle);
    if let Some(handle) = handle.as_ref() {
        if let Err(err) = ALERTS.acknowledge_fired(handle) {
            log::warn!("event=alert_delivered module=ffi status=error handle={handle} error={err}");
        }
    }

    let event = AlertEvent {
        kind,
        handle,
        payload,
    };
    match with_service(|service| service.handle_alert_event(&event)) {
        Ok(Some(_)) => ActionResponse::success("Next reminder armed.", None),
        Ok(None) => ActionResponse::success("No reminder re-armed.", None),
        Err(err) => ActionResponse::failure(format!("alert handling failed: {err}")),
    }
}

fn resolve_store_path() -> PathBuf {
    DB_PATH.get_or_init(|| resolve_db_path(None)).clone()
}

fn with_service<T>(f: impl FnOnce(&HostService<'_>) -> T) -> Result<T, String> {
    let _guard = CALL_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let conn = open_db(resolve_store_path()).map_err(|err| format!("store open failed: {err}"))?;
    let service = ReminderService::new(SqliteKeyValueStore::new(&conn), &*ALERTS, SystemClock);
    Ok(f(&service))
}

fn parse_medicine_id(raw: &str) -> Result<MedicineId, String> {
    MedicineId::parse_str(raw.trim()).map_err(|_| format!("invalid medicine id `{}`", raw.trim()))
}

fn to_medicine_item(medicine: &Medicine) -> MedicineItem {
    MedicineItem {
        id: medicine.id.to_string(),
        name: medicine.name.clone(),
        times: medicine.times.iter().map(ToString::to_string).collect(),
    }
}

fn to_today_item(item: &TodaysMedicine) -> TodayItem {
    TodayItem {
        id: item.medicine.id.to_string(),
        name: item.medicine.name.clone(),
        doses: item
            .medicine
            .times
            .iter()
            .map(|&time| {
                let event = item.todays_status.get(&time);
                TodayDose {
                    time: time.to_string(),
                    taken: item.is_taken(time),
                    taken_at_ms: event.filter(|event| event.taken).map(|event| event.timestamp),
                }
            })
            .collect(),
    }
}

fn to_history_day(date: chrono::NaiveDate, day: DayRecord) -> HistoryDay {
    HistoryDay {
        date: date.to_string(),
        medicines: day
            .medicines
            .into_iter()
            .map(|(medicine_id, entry)| HistoryMedicine {
                medicine_id: medicine_id.to_string(),
                name: entry.name,
                doses: entry
                    .times
                    .into_iter()
                    .map(|(time, event)| HistoryDose {
                        time: time.to_string(),
                        taken: event.taken,
                        timestamp: event.timestamp,
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn to_alert_command_item(command: AlertCommand) -> Option<AlertCommandItem> {
    match command {
        AlertCommand::Arm {
            handle,
            delay_seconds,
            content,
            payload,
        } => {
            let payload_json = payload
                .to_json()
                .map_err(|err| {
                    log::error!(
                        "event=alerts_take_pending module=ffi status=error handle={handle} error={err}"
                    );
                })
                .ok()?;
            Some(AlertCommandItem {
                kind: "arm".to_string(),
                handle: handle.0,
                delay_seconds: Some(delay_seconds),
                title: Some(content.title),
                body: Some(content.body),
                sound: Some(content.sound),
                payload_json: Some(payload_json),
            })
        }
        AlertCommand::Cancel { handle } => Some(AlertCommandItem {
            kind: "cancel".to_string(),
            handle: handle.0,
            delay_seconds: None,
            title: None,
            body: None,
            sound: None,
            payload_json: None,
        }),
    }
}
