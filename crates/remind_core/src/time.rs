use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// When a deferred notification should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliverAt {
    /// Wall-clock time in the device's zone, converted once at scheduling time.
    Local(NaiveDateTime),
    Instant(DateTime<Utc>),
}

impl DeliverAt {
    /// Local wall-clock time `delay` from now.
    pub fn after(delay: Duration) -> Self {
        Self::Local(Local::now().naive_local() + delay)
    }

    pub fn to_epoch_millis(&self) -> i64 {
        match self {
            Self::Local(naive) => local_to_epoch_millis(naive, &Local),
            Self::Instant(instant) => instant.timestamp_millis(),
        }
    }
}

impl From<DateTime<Utc>> for DeliverAt {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::Instant(instant)
    }
}

impl From<NaiveDateTime> for DeliverAt {
    fn from(local: NaiveDateTime) -> Self {
        Self::Local(local)
    }
}

/// Resolves a wall-clock time in `tz` to UTC epoch milliseconds.
///
/// Ambiguous times (clocks going back) resolve to the earlier instant. Times
/// inside a gap (clocks going forward) are pushed past the gap.
pub fn local_to_epoch_millis<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> i64 {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => dt.timestamp_millis(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
        LocalResult::None => {
            let shifted = *naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.timestamp_millis())
                .unwrap_or_else(|| naive.and_utc().timestamp_millis())
        }
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
