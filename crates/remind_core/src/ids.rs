use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// Distinguishes concurrently visible notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub u32);

/// Request code of a deferred activation (alarm token or resumption action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationId(pub u32);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Monotonic counter scoped to the owning engine instance.
///
/// Values are not persisted: a restarted process starts again from its seed.
#[derive(Debug)]
pub struct IdCounter {
    next: AtomicU32,
}

impl IdCounter {
    pub fn starting_at(seed: u32) -> Self {
        Self {
            next: AtomicU32::new(seed),
        }
    }

    /// Returns the current value and advances the counter.
    pub fn next(&self) -> u32 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

/// Where an engine draws display or activation ids from.
///
/// The in-memory [`IdCounter`] serves hosts whose notification state dies
/// with the process. Hosts that keep notifications and alarms across
/// processes supply a sequence shared by every process.
pub trait IdSequence: Send + Sync {
    /// Returns a value this sequence has not handed out before.
    fn allocate(&self) -> Result<u32, PlatformError>;

    /// The value the next `allocate` returns, unless another caller takes it.
    fn upcoming(&self) -> Result<u32, PlatformError>;
}

impl IdSequence for IdCounter {
    fn allocate(&self) -> Result<u32, PlatformError> {
        Ok(self.next())
    }

    fn upcoming(&self) -> Result<u32, PlatformError> {
        Ok(self.peek())
    }
}
