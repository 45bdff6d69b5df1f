use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::EngineError,
    ids::{ActivationId, DisplayId, IdSequence},
    payload::NotificationPayload,
    platform::{NotificationPlatform, PlatformNotification, ResumeAction},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub display_id: DisplayId,
    pub resume_code: ActivationId,
    pub title: String,
    pub body: String,
    pub shown_at: DateTime<Utc>,
}

/// Renders notifications through the platform, each under a fresh display id.
pub struct DeliverySurface {
    platform: Arc<dyn NotificationPlatform>,
    channel_id: String,
    auto_cancel: bool,
    display_ids: Arc<dyn IdSequence>,
    activations: Arc<dyn IdSequence>,
}

impl DeliverySurface {
    pub fn new(
        platform: Arc<dyn NotificationPlatform>,
        channel_id: impl Into<String>,
        display_ids: Arc<dyn IdSequence>,
        activations: Arc<dyn IdSequence>,
    ) -> Self {
        Self {
            platform,
            channel_id: channel_id.into(),
            auto_cancel: true,
            display_ids,
            activations,
        }
    }

    pub fn with_auto_cancel(mut self, auto_cancel: bool) -> Self {
        self.auto_cancel = auto_cancel;
        self
    }

    pub fn show(&self, payload: &NotificationPayload) -> Result<DeliveryRecord, EngineError> {
        let display_id = DisplayId(
            self.display_ids
                .allocate()
                .map_err(EngineError::IdAllocation)?,
        );
        let resume_code = ActivationId(
            self.activations
                .allocate()
                .map_err(EngineError::IdAllocation)?,
        );
        let notification = PlatformNotification {
            channel_id: self.channel_id.clone(),
            display_id,
            title: payload.title.clone(),
            body: payload.body.clone(),
            resume: ResumeAction {
                request_code: resume_code,
                extras: payload.to_extras(),
            },
            auto_cancel: self.auto_cancel,
        };
        self.platform
            .post(notification)
            .map_err(|source| EngineError::Delivery { display_id, source })?;
        debug!(%display_id, "notification posted");
        Ok(DeliveryRecord {
            display_id,
            resume_code,
            title: payload.title.clone(),
            body: payload.body.clone(),
            shown_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::NotificationChannel;
    use crate::error::PlatformError;
    use crate::ids::IdCounter;
    use crate::memory::MemoryPlatform;
    use crate::payload::MESSAGE_KEY;

    fn surface(platform: Arc<MemoryPlatform>) -> DeliverySurface {
        DeliverySurface::new(
            platform,
            "default",
            Arc::new(IdCounter::default()),
            Arc::new(IdCounter::default()),
        )
    }

    #[test]
    fn repeated_payload_yields_distinct_notifications() {
        let platform = Arc::new(MemoryPlatform::new());
        platform
            .create_channel(&NotificationChannel::default())
            .unwrap();
        let surface = surface(platform.clone());
        let payload = NotificationPayload::new("Same", "Same");

        let first = surface.show(&payload).unwrap();
        let second = surface.show(&payload).unwrap();

        assert!(second.display_id > first.display_id);
        assert_eq!(platform.posted().len(), 2);
        let resume = &platform.posted()[1].resume;
        assert_eq!(resume.extras.get(MESSAGE_KEY).map(String::as_str), Some("Same"));
    }

    #[test]
    fn missing_channel_is_a_delivery_error() {
        let platform = Arc::new(MemoryPlatform::new());
        let err = surface(platform.clone())
            .show(&NotificationPayload::new("t", "b"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Delivery { display_id: DisplayId(0), .. }));
        assert!(platform.posted().is_empty());
    }

    struct SpentSequence;

    impl IdSequence for SpentSequence {
        fn allocate(&self) -> Result<u32, PlatformError> {
            Err(PlatformError::Exhausted("id space".into()))
        }

        fn upcoming(&self) -> Result<u32, PlatformError> {
            Err(PlatformError::Exhausted("id space".into()))
        }
    }

    #[test]
    fn unavailable_ids_post_nothing() {
        let platform = Arc::new(MemoryPlatform::new());
        platform
            .create_channel(&NotificationChannel::default())
            .unwrap();
        let surface = DeliverySurface::new(
            platform.clone(),
            "default",
            Arc::new(SpentSequence),
            Arc::new(IdCounter::default()),
        );
        let err = surface.show(&NotificationPayload::new("t", "b")).unwrap_err();
        assert!(matches!(err, EngineError::IdAllocation(PlatformError::Exhausted(_))));
        assert!(platform.posted().is_empty());
    }
}
