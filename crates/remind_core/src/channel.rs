use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{EngineError, PlatformError},
    platform::NotificationPlatform,
};

pub const DEFAULT_CHANNEL_ID: &str = "default";
pub const DEFAULT_CHANNEL_NAME: &str = "Default";
pub const DEFAULT_CHANNEL_DESCRIPTION: &str = "Default channel for receiving notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    None,
    Min,
    Low,
    #[default]
    Default,
    High,
}

impl FromStr for Importance {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "min" => Ok(Self::Min),
            "low" => Ok(Self::Low),
            "default" => Ok(Self::Default),
            "high" => Ok(Self::High),
            other => Err(format!("unknown importance `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self {
            id: DEFAULT_CHANNEL_ID.to_owned(),
            name: DEFAULT_CHANNEL_NAME.to_owned(),
            description: DEFAULT_CHANNEL_DESCRIPTION.to_owned(),
            importance: Importance::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Not yet created, or the last attempt failed.
    Pending,
    Ready,
    /// The platform has no channel concept; nothing to create.
    Unsupported,
}

/// Creates the configured channel at most once per registry lifetime.
#[derive(Debug)]
pub struct ChannelRegistry {
    channel: NotificationChannel,
    state: Mutex<ChannelState>,
}

impl ChannelRegistry {
    pub fn new(channel: NotificationChannel) -> Self {
        Self {
            channel,
            state: Mutex::new(ChannelState::Pending),
        }
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Safe to call from any path about to surface a notification. The lock
    /// is held across the platform call so concurrent callers issue a single
    /// create.
    pub fn ensure(&self, platform: &dyn NotificationPlatform) -> ChannelState {
        let mut state = self.state.lock();
        if *state != ChannelState::Pending {
            return *state;
        }
        if !platform.supports_channels() {
            debug!("platform has no notification channels");
            *state = ChannelState::Unsupported;
            return *state;
        }
        match platform.create_channel(&self.channel) {
            Ok(()) => {
                debug!(channel = %self.channel.id, "notification channel registered");
                *state = ChannelState::Ready;
            }
            Err(PlatformError::Unsupported) => {
                *state = ChannelState::Unsupported;
            }
            Err(source) => {
                let err = EngineError::Configuration {
                    id: self.channel.id.clone(),
                    source,
                };
                warn!(%err, "continuing without a confirmed channel");
            }
        }
        *state
    }
}
