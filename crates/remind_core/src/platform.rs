use serde::{Deserialize, Serialize};

use crate::{
    channel::NotificationChannel,
    error::PlatformError,
    ids::{ActivationId, DisplayId},
    payload::Extras,
    scheduler::DeferredAlarm,
};

/// Activation attached to a visible notification; tapping it reopens the
/// application with `extras`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeAction {
    pub request_code: ActivationId,
    pub extras: Extras,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformNotification {
    pub channel_id: String,
    pub display_id: DisplayId,
    pub title: String,
    pub body: String,
    pub resume: ResumeAction,
    pub auto_cancel: bool,
}

/// Platform-specific notification facilities implement this trait.
pub trait NotificationPlatform: Send + Sync {
    fn supports_channels(&self) -> bool {
        true
    }

    /// Registering an id that already exists must be a silent no-op.
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), PlatformError>;

    fn post(&self, notification: PlatformNotification) -> Result<(), PlatformError>;

    /// Registers a one-shot wake-up at `alarm.trigger_at_millis` (absolute,
    /// UTC epoch milliseconds).
    fn set_alarm(&self, alarm: &DeferredAlarm) -> Result<(), PlatformError>;
}
