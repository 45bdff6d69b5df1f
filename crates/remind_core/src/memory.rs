//! In-process notification platform. Keeps the OS-side registries in memory,
//! which makes it suitable for headless embedding and for exercising the
//! engine without a device.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::{
    channel::NotificationChannel,
    error::PlatformError,
    ids::DisplayId,
    payload::Extras,
    platform::{NotificationPlatform, PlatformNotification},
    scheduler::DeferredAlarm,
};

#[derive(Debug, Default)]
struct Registry {
    channels: BTreeMap<String, NotificationChannel>,
    create_calls: usize,
    failing_creates: usize,
    failing_posts: bool,
    posted: Vec<PlatformNotification>,
    alarms: Vec<DeferredAlarm>,
}

#[derive(Debug)]
pub struct MemoryPlatform {
    supports_channels: bool,
    registry: Mutex<Registry>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            supports_channels: true,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn without_channel_support(mut self) -> Self {
        self.supports_channels = false;
        self
    }

    pub fn fail_next_channel_create(&self) {
        self.registry.lock().failing_creates += 1;
    }

    pub fn set_failing_posts(&self, failing: bool) {
        self.registry.lock().failing_posts = failing;
    }

    pub fn channels(&self) -> Vec<NotificationChannel> {
        self.registry.lock().channels.values().cloned().collect()
    }

    pub fn create_channel_calls(&self) -> usize {
        self.registry.lock().create_calls
    }

    /// Notifications currently visible to the user.
    pub fn posted(&self) -> Vec<PlatformNotification> {
        self.registry.lock().posted.clone()
    }

    pub fn pending_alarms(&self) -> Vec<DeferredAlarm> {
        self.registry.lock().alarms.clone()
    }

    /// Removes and returns every alarm due at `now_millis`, earliest first.
    pub fn take_due(&self, now_millis: i64) -> Vec<DeferredAlarm> {
        let mut registry = self.registry.lock();
        let (mut due, pending): (Vec<_>, Vec<_>) = registry
            .alarms
            .drain(..)
            .partition(|alarm| alarm.trigger_at_millis <= now_millis);
        registry.alarms = pending;
        due.sort_by_key(|alarm| (alarm.trigger_at_millis, alarm.id));
        due
    }

    /// Simulates the user tapping a notification: it is dismissed and its
    /// resumption extras are returned.
    pub fn tap(&self, display_id: DisplayId) -> Option<Extras> {
        let mut registry = self.registry.lock();
        let index = registry
            .posted
            .iter()
            .position(|n| n.display_id == display_id)?;
        let notification = if registry.posted[index].auto_cancel {
            registry.posted.remove(index)
        } else {
            registry.posted[index].clone()
        };
        Some(notification.resume.extras)
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationPlatform for MemoryPlatform {
    fn supports_channels(&self) -> bool {
        self.supports_channels
    }

    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), PlatformError> {
        if !self.supports_channels {
            return Err(PlatformError::Unsupported);
        }
        let mut registry = self.registry.lock();
        registry.create_calls += 1;
        if registry.failing_creates > 0 {
            registry.failing_creates -= 1;
            return Err(PlatformError::Other("channel service unavailable".into()));
        }
        registry
            .channels
            .entry(channel.id.clone())
            .or_insert_with(|| channel.clone());
        Ok(())
    }

    fn post(&self, notification: PlatformNotification) -> Result<(), PlatformError> {
        let mut registry = self.registry.lock();
        if registry.failing_posts {
            return Err(PlatformError::Exhausted("notification quota reached".into()));
        }
        if self.supports_channels && !registry.channels.contains_key(&notification.channel_id) {
            return Err(PlatformError::MissingChannel(notification.channel_id));
        }
        // Same display id replaces in place, as a real notification manager does.
        registry
            .posted
            .retain(|existing| existing.display_id != notification.display_id);
        registry.posted.push(notification);
        Ok(())
    }

    fn set_alarm(&self, alarm: &DeferredAlarm) -> Result<(), PlatformError> {
        self.registry.lock().alarms.push(alarm.clone());
        Ok(())
    }
}
