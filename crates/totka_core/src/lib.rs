//! Core domain logic for the Totka medicine reminder.
//! This crate is the single source of truth for scheduling and adherence
//! invariants; the host app only renders what it returns.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::resolve_db_path;
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::alert::{
    AlertContent, AlertEvent, AlertEventKind, AlertHandle, AlertPayload, ArmedAlert,
};
pub use model::history::{DayRecord, DoseEvent, HistoryLog, MedicineDayEntry};
pub use model::medicine::{DoseTime, Medicine, MedicineId, ValidationError};
pub use notify::queued_platform::{AlertCommand, QueuedAlertPlatform};
pub use notify::scheduler::NotificationScheduler;
pub use notify::{AlertError, AlertPlatform, AlertResult};
pub use repo::kv_store::{KeyValueStore, SqliteKeyValueStore, StoreError, StoreKey, StoreResult};
pub use service::adherence_service::{AdherenceError, AdherenceLog, TodaysMedicine};
pub use service::history_service::{DaySummary, HistoryQuery};
pub use service::registry_service::{MedicineRegistry, RegistryError, RegistryResult};
pub use service::reminder_service::{AlertSyncReport, ReminderService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
