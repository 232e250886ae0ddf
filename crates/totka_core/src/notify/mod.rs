//! Local notification scheduling.
//!
//! # Responsibility
//! - Define the narrow platform alert contract (`AlertPlatform`).
//! - Compute fire instants and arm one-shot alerts per (medicine, time).
//! - Provide the queued platform adapter drained by the host app.
//!
//! # Invariants
//! - Alerts are one-shot; daily repetition is re-armed on fire/tap.
//! - Platform failures are logged and never propagate to callers.

use crate::model::alert::{AlertContent, AlertHandle, AlertPayload, ArmedAlert};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod queued_platform;
pub mod scheduler;

pub type AlertResult<T> = Result<T, AlertError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    /// The platform alert API rejected or failed the call.
    Platform(String),
    /// An inbound event carried a payload that could not be decoded.
    InvalidPayload(String),
}

impl Display for AlertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Platform(message) => write!(f, "alert platform failure: {message}"),
            Self::InvalidPayload(message) => write!(f, "invalid alert payload: {message}"),
        }
    }
}

impl Error for AlertError {}

impl From<serde_json::Error> for AlertError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidPayload(value.to_string())
    }
}

/// Platform alert API.
pub trait AlertPlatform {
    /// Arms a one-shot alert firing after `delay_seconds`.
    fn arm_one_shot(
        &self,
        delay_seconds: u64,
        content: &AlertContent,
        payload: &AlertPayload,
    ) -> AlertResult<AlertHandle>;
    fn cancel(&self, handle: &AlertHandle) -> AlertResult<()>;
    /// Every alert currently armed, in no particular order.
    fn list_armed(&self) -> AlertResult<Vec<ArmedAlert>>;
}

impl<T: AlertPlatform + ?Sized> AlertPlatform for &T {
    fn arm_one_shot(
        &self,
        delay_seconds: u64,
        content: &AlertContent,
        payload: &AlertPayload,
    ) -> AlertResult<AlertHandle> {
        (**self).arm_one_shot(delay_seconds, content, payload)
    }

    fn cancel(&self, handle: &AlertHandle) -> AlertResult<()> {
        (**self).cancel(handle)
    }

    fn list_armed(&self) -> AlertResult<Vec<ArmedAlert>> {
        (**self).list_armed()
    }
}
