pub mod channel;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod events;
pub mod ids;
pub mod memory;
pub mod payload;
pub mod platform;
pub mod scheduler;
pub mod time;
pub mod trigger;

pub use crate::engine::{
    Dispatch, EngineCell, NotificationEngine, NotificationEngineBuilder, NotificationRequest,
};
pub use crate::trigger::{TriggerHandler, TriggerOutcome};
