use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use remind_core::{
    channel::NotificationChannel,
    error::PlatformError,
    platform::{NotificationPlatform, PlatformNotification},
    scheduler::DeferredAlarm,
    NotificationEngine, NotificationEngineBuilder,
};

use crate::sequence::FileSequence;
use crate::store::{read_json, update_json, HostPaths};

/// A notification sitting in the desktop shade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadeEntry {
    #[serde(flatten)]
    pub notification: PlatformNotification,
    pub posted_at: DateTime<Utc>,
}

type ChannelTable = BTreeMap<String, NotificationChannel>;

/// Desktop stand-in for the mobile OS notification and alarm services. All
/// state lives in files under [`HostPaths`], so it outlives the process that
/// scheduled an alarm.
#[derive(Debug, Clone)]
pub struct DesktopPlatform {
    paths: HostPaths,
}

impl DesktopPlatform {
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }

    /// Engine builder drawing ids from the sequences in `counters.json`,
    /// shared by every process using this home.
    pub fn engine_builder(&self) -> NotificationEngineBuilder {
        NotificationEngine::builder().with_id_sequences(
            Arc::new(FileSequence::display_ids(&self.paths)),
            Arc::new(FileSequence::activations(&self.paths)),
        )
    }

    pub fn channels(&self) -> Result<Vec<NotificationChannel>> {
        let table: ChannelTable = read_json(&self.paths.channels_file())?;
        Ok(table.into_values().collect())
    }

    pub fn pending_alarms(&self) -> Result<Vec<DeferredAlarm>> {
        read_json(&self.paths.alarms_file())
    }

    /// Earliest pending trigger time, if any.
    pub fn next_trigger(&self) -> Result<Option<i64>> {
        Ok(self
            .pending_alarms()?
            .iter()
            .map(|alarm| alarm.trigger_at_millis)
            .min())
    }

    /// Removes every alarm due at `now_millis` from the registry, earliest
    /// first. Removal and hand-out happen under one lock so an alarm is
    /// fired by at most one daemon.
    pub fn take_due(&self, now_millis: i64) -> Result<Vec<DeferredAlarm>> {
        // Skip the write when nothing is due; the daemon watches this file.
        let pending = self.pending_alarms()?;
        if pending.iter().all(|alarm| alarm.trigger_at_millis > now_millis) {
            return Ok(Vec::new());
        }
        update_json(&self.paths.alarms_file(), |alarms: &mut Vec<DeferredAlarm>| {
            let (mut due, pending): (Vec<_>, Vec<_>) = alarms
                .drain(..)
                .partition(|alarm| alarm.trigger_at_millis <= now_millis);
            *alarms = pending;
            due.sort_by_key(|alarm| (alarm.trigger_at_millis, alarm.id));
            due
        })
    }
}

fn platform_error(err: anyhow::Error) -> PlatformError {
    PlatformError::Other(format!("{err:#}"))
}

impl NotificationPlatform for DesktopPlatform {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), PlatformError> {
        update_json(&self.paths.channels_file(), |table: &mut ChannelTable| {
            table
                .entry(channel.id.clone())
                .or_insert_with(|| channel.clone());
        })
        .map_err(platform_error)
    }

    fn post(&self, notification: PlatformNotification) -> Result<(), PlatformError> {
        let channels: ChannelTable =
            read_json(&self.paths.channels_file()).map_err(platform_error)?;
        if !channels.contains_key(&notification.channel_id) {
            return Err(PlatformError::MissingChannel(notification.channel_id));
        }
        info!(
            display_id = %notification.display_id,
            title = %notification.title,
            body = %notification.body,
            "notification"
        );
        update_json(&self.paths.shade_file(), |shade: &mut Vec<ShadeEntry>| {
            shade.retain(|entry| entry.notification.display_id != notification.display_id);
            shade.push(ShadeEntry {
                notification,
                posted_at: Utc::now(),
            });
        })
        .map_err(platform_error)
    }

    /// An alarm reusing the request code of a pending one cancels and
    /// replaces it.
    fn set_alarm(&self, alarm: &DeferredAlarm) -> Result<(), PlatformError> {
        update_json(&self.paths.alarms_file(), |alarms: &mut Vec<DeferredAlarm>| {
            alarms.retain(|pending| pending.id != alarm.id);
            alarms.push(alarm.clone());
        })
        .map_err(platform_error)
    }
}
