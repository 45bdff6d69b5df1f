use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::EngineError,
    ids::{ActivationId, IdSequence},
    payload::{Extras, NotificationPayload},
    platform::NotificationPlatform,
};

/// A one-shot wake-up owned by the OS once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredAlarm {
    pub id: ActivationId,
    pub payload: NotificationPayload,
    pub trigger_at_millis: i64,
}

impl DeferredAlarm {
    /// Extras handed back to the trigger handler when the alarm fires.
    pub fn extras(&self) -> Extras {
        self.payload.to_extras()
    }
}

/// Registers deferred deliveries with the OS alarm facility. The OS is the
/// system of record for pending alarms; nothing is retained here.
pub struct AlarmScheduler {
    platform: Arc<dyn NotificationPlatform>,
    activations: Arc<dyn IdSequence>,
}

impl AlarmScheduler {
    pub fn new(platform: Arc<dyn NotificationPlatform>, activations: Arc<dyn IdSequence>) -> Self {
        Self {
            platform,
            activations,
        }
    }

    /// Every call registers an independent alarm, even for an identical
    /// payload and time.
    pub fn schedule_at(
        &self,
        trigger_at_millis: i64,
        payload: NotificationPayload,
    ) -> Result<DeferredAlarm, EngineError> {
        let id = self
            .activations
            .allocate()
            .map_err(EngineError::IdAllocation)?;
        let alarm = DeferredAlarm {
            id: ActivationId(id),
            payload,
            trigger_at_millis,
        };
        self.platform
            .set_alarm(&alarm)
            .map_err(|source| EngineError::Scheduling {
                alarm_id: alarm.id,
                source,
            })?;
        debug!(alarm_id = %alarm.id, trigger_at_millis, "alarm registered");
        Ok(alarm)
    }
}
