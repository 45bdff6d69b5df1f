use tracing::{debug, warn};

use crate::{
    delivery::DeliveryRecord,
    engine::{Dispatch, EngineCell, NotificationEngine},
    payload::{Extras, NotificationPayload},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Delivered(DeliveryRecord),
    /// The payload was fine but the platform refused the notification.
    Failed,
    /// Absent or malformed payload; nothing was attempted.
    Ignored,
}

/// Entry point for a fired alarm. It may be the first code to run in a
/// fresh process, so the engine is built on demand through `factory`.
pub struct TriggerHandler<'a> {
    cell: &'a EngineCell,
    factory: Box<dyn Fn() -> NotificationEngine + Send + Sync>,
}

impl<'a> TriggerHandler<'a> {
    pub fn new(
        cell: &'a EngineCell,
        factory: impl Fn() -> NotificationEngine + Send + Sync + 'static,
    ) -> Self {
        Self {
            cell,
            factory: Box::new(factory),
        }
    }

    /// Fired -> Delivered. A failed delivery is final; nothing is retried.
    pub fn on_receive(&self, extras: Option<&Extras>) -> TriggerOutcome {
        let Some(extras) = extras else {
            debug!("alarm fired without extras");
            return TriggerOutcome::Ignored;
        };
        let payload = match NotificationPayload::from_extras(extras) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(%err, "ignoring alarm");
                return TriggerOutcome::Ignored;
            }
        };

        let engine = self.cell.get_or_init(|| (self.factory)());
        match engine.show(payload.title, payload.body) {
            Dispatch::Shown(record) => TriggerOutcome::Delivered(record),
            _ => {
                warn!("fired alarm could not be delivered");
                TriggerOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPlatform;
    use crate::payload::TITLE_KEY;
    use std::sync::Arc;

    #[test]
    fn missing_extras_are_ignored() {
        let cell = EngineCell::new();
        let handler = TriggerHandler::new(&cell, || panic!("engine must not be built"));
        assert_eq!(handler.on_receive(None), TriggerOutcome::Ignored);
        assert!(cell.get().is_none());
    }

    #[test]
    fn cold_start_builds_engine_and_channel() {
        let cell = EngineCell::new();
        let platform = Arc::new(MemoryPlatform::new());
        let factory_platform = platform.clone();
        let handler = TriggerHandler::new(&cell, move || {
            NotificationEngine::builder().build(factory_platform.clone())
        });

        let mut extras = NotificationPayload::new("Wake", "up").to_extras();
        let outcome = handler.on_receive(Some(&extras));

        assert!(matches!(outcome, TriggerOutcome::Delivered(ref r) if r.title == "Wake"));
        assert!(cell.get().is_some());
        assert_eq!(platform.channels().len(), 1);

        extras.remove(TITLE_KEY);
        assert_eq!(handler.on_receive(Some(&extras)), TriggerOutcome::Ignored);
        assert_eq!(platform.posted().len(), 1);
    }
}
