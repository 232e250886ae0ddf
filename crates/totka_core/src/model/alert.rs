//! Platform alert shapes shared by the scheduler and the host bridge.
//!
//! Alerts are owned by the platform; the core never persists them. The only
//! link back to a medicine is the `medicine_id` carried in the payload.

use crate::model::medicine::{DoseTime, MedicineId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const ALERT_TITLE: &str = "Medicine Reminder";
pub const ALERT_SOUND: &str = "default";

/// Opaque platform handle of one armed alert.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertHandle(pub String);

impl AlertHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AlertHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data attached to every alert and echoed back by fired/tapped events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub time: DoseTime,
    /// Unix epoch milliseconds of the intended fire instant.
    pub scheduled_time: i64,
}

impl AlertPayload {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// User-visible notification content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertContent {
    pub title: String,
    pub body: String,
    pub sound: String,
    pub high_priority: bool,
}

impl AlertContent {
    pub fn reminder_for(medicine_name: &str) -> Self {
        Self {
            title: ALERT_TITLE.to_string(),
            body: format!("Time to take {medicine_name}!"),
            sound: ALERT_SOUND.to_string(),
            high_priority: true,
        }
    }
}

/// One alert currently armed on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmedAlert {
    pub handle: AlertHandle,
    pub payload: AlertPayload,
}

/// Why the platform reported an alert back to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEventKind {
    /// Delivered to the user (foreground or background).
    Fired,
    /// The user tapped the notification.
    Tapped,
}

/// Inbound alert event from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub kind: AlertEventKind,
    /// Present when the platform reports which alert it was.
    pub handle: Option<AlertHandle>,
    pub payload: AlertPayload,
}
