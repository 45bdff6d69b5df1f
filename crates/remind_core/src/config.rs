use std::str::FromStr;

use chrono::Utc;
use tracing::warn;

use crate::channel::{Importance, NotificationChannel};

/// Where the process-scoped id counters start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterSeed {
    /// Start at zero on every process start.
    #[default]
    Zero,
    /// Start from the wall clock in seconds so ids issued by an earlier
    /// process incarnation are unlikely to be reissued.
    Clock,
}

impl CounterSeed {
    pub fn initial_value(self) -> u32 {
        match self {
            Self::Zero => 0,
            Self::Clock => Utc::now().timestamp().rem_euclid(1 << 31) as u32,
        }
    }
}

impl FromStr for CounterSeed {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Ok(Self::Zero),
            "clock" | "time" => Ok(Self::Clock),
            other => Err(format!("unknown counter seed `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub channel: NotificationChannel,
    pub counter_seed: CounterSeed,
    pub auto_cancel: bool,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(id) = std::env::var("REMIND_CHANNEL_ID") {
            if !id.trim().is_empty() {
                config.channel.id = id.trim().to_owned();
            }
        }
        if let Ok(name) = std::env::var("REMIND_CHANNEL_NAME") {
            config.channel.name = name;
        }
        if let Ok(description) = std::env::var("REMIND_CHANNEL_DESCRIPTION") {
            config.channel.description = description;
        }
        if let Ok(importance) = std::env::var("REMIND_CHANNEL_IMPORTANCE") {
            match importance.parse::<Importance>() {
                Ok(value) => config.channel.importance = value,
                Err(err) => warn!(%err, "ignoring REMIND_CHANNEL_IMPORTANCE"),
            }
        }
        if let Ok(seed) = std::env::var("REMIND_COUNTER_SEED") {
            match seed.parse::<CounterSeed>() {
                Ok(value) => config.counter_seed = value,
                Err(err) => warn!(%err, "ignoring REMIND_COUNTER_SEED"),
            }
        }
        config
    }

    pub fn with_channel(mut self, channel: NotificationChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_counter_seed(mut self, seed: CounterSeed) -> Self {
        self.counter_seed = seed;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel: NotificationChannel::default(),
            counter_seed: CounterSeed::Zero,
            auto_cancel: true,
        }
    }
}
