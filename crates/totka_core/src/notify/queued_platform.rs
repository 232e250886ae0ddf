//! Alert platform adapter for hosts that own the OS notification API.
//!
//! The core cannot call the host's notification plugin directly. Instead,
//! this adapter mirrors the armed set in memory, mints handles, and queues
//! commands; the host drains the queue after each call and replays it
//! against the OS, using the minted handle as the notification identifier.

use crate::model::alert::{AlertContent, AlertHandle, AlertPayload, ArmedAlert};
use crate::notify::{AlertError, AlertPlatform, AlertResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Instruction for the host to apply to the OS notification store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertCommand {
    Arm {
        handle: AlertHandle,
        delay_seconds: u64,
        content: AlertContent,
        payload: AlertPayload,
    },
    Cancel {
        handle: AlertHandle,
    },
}

#[derive(Default)]
struct QueueState {
    armed: BTreeMap<AlertHandle, AlertPayload>,
    pending: Vec<AlertCommand>,
}

#[derive(Default)]
pub struct QueuedAlertPlatform {
    state: Mutex<QueueState>,
}

impl QueuedAlertPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the commands issued since the last drain.
    pub fn take_pending(&self) -> AlertResult<Vec<AlertCommand>> {
        Ok(std::mem::take(&mut self.lock()?.pending))
    }

    /// Replaces the armed mirror with the host's view of the OS store.
    ///
    /// Used after a process restart, when the in-memory mirror is empty but
    /// the OS still holds alerts from the previous run.
    pub fn restore_armed(&self, alerts: Vec<ArmedAlert>) -> AlertResult<()> {
        let mut state = self.lock()?;
        state.armed = alerts
            .into_iter()
            .map(|alert| (alert.handle, alert.payload))
            .collect();
        Ok(())
    }

    /// Drops a delivered one-shot alert from the mirror.
    ///
    /// Returns `false` when the handle was not armed.
    pub fn acknowledge_fired(&self, handle: &AlertHandle) -> AlertResult<bool> {
        Ok(self.lock()?.armed.remove(handle).is_some())
    }

    fn lock(&self) -> AlertResult<MutexGuard<'_, QueueState>> {
        self.state
            .lock()
            .map_err(|_| AlertError::Platform("alert queue lock poisoned".to_string()))
    }
}

impl AlertPlatform for QueuedAlertPlatform {
    fn arm_one_shot(
        &self,
        delay_seconds: u64,
        content: &AlertContent,
        payload: &AlertPayload,
    ) -> AlertResult<AlertHandle> {
        let handle = AlertHandle(Uuid::new_v4().to_string());
        let mut state = self.lock()?;
        state.armed.insert(handle.clone(), payload.clone());
        state.pending.push(AlertCommand::Arm {
            handle: handle.clone(),
            delay_seconds,
            content: content.clone(),
            payload: payload.clone(),
        });
        Ok(handle)
    }

    fn cancel(&self, handle: &AlertHandle) -> AlertResult<()> {
        let mut state = self.lock()?;
        state.armed.remove(handle);
        state.pending.push(AlertCommand::Cancel {
            handle: handle.clone(),
        });
        Ok(())
    }

    fn list_armed(&self) -> AlertResult<Vec<ArmedAlert>> {
        Ok(self
            .lock()?
            .armed
            .iter()
            .map(|(handle, payload)| ArmedAlert {
                handle: handle.clone(),
                payload: payload.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{AlertCommand, QueuedAlertPlatform};
    use crate::model::alert::{AlertContent, AlertPayload};
    use crate::model::medicine::DoseTime;
    use crate::notify::AlertPlatform;
    use uuid::Uuid;

    fn payload() -> AlertPayload {
        AlertPayload {
            medicine_id: Uuid::now_v7(),
            medicine_name: "Aspirin".to_string(),
            time: DoseTime::new(9, 0).unwrap(),
            scheduled_time: 0,
        }
    }

    #[test]
    fn arm_and_cancel_are_mirrored_and_queued() {
        let platform = QueuedAlertPlatform::new();
        let content = AlertContent::reminder_for("Aspirin");

        let handle = platform.arm_one_shot(60, &content, &payload()).unwrap();
        assert_eq!(platform.list_armed().unwrap().len(), 1);

        platform.cancel(&handle).unwrap();
        assert!(platform.list_armed().unwrap().is_empty());

        let commands = platform.take_pending().unwrap();
        assert_eq!(commands.len(), 2);
        assert!(matches!(&commands[0], AlertCommand::Arm { delay_seconds: 60, .. }));
        assert!(matches!(&commands[1], AlertCommand::Cancel { handle: h } if *h == handle));
        assert!(platform.take_pending().unwrap().is_empty());
    }

    #[test]
    fn acknowledge_fired_removes_from_mirror_without_queueing() {
        let platform = QueuedAlertPlatform::new();
        let handle = platform
            .arm_one_shot(5, &AlertContent::reminder_for("Aspirin"), &payload())
            .unwrap();
        platform.take_pending().unwrap();

        assert!(platform.acknowledge_fired(&handle).unwrap());
        assert!(!platform.acknowledge_fired(&handle).unwrap());
        assert!(platform.take_pending().unwrap().is_empty());
    }
}
