use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::{
    channel::{ChannelRegistry, ChannelState, NotificationChannel},
    config::EngineConfig,
    delivery::{DeliveryRecord, DeliverySurface},
    events::{EventHub, InlineDispatcher, ReceivedEvent, SubscriptionId, UiDispatcher},
    error::PlatformError,
    ids::{ActivationId, DisplayId, IdCounter, IdSequence},
    payload::NotificationPayload,
    platform::NotificationPlatform,
    scheduler::{AlarmScheduler, DeferredAlarm},
    time::DeliverAt,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub deliver_at: Option<DeliverAt>,
}

impl NotificationRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            deliver_at: None,
        }
    }

    pub fn deliver_at(mut self, at: impl Into<DeliverAt>) -> Self {
        self.deliver_at = Some(at.into());
        self
    }
}

/// What became of a request. Failures are logged where they happen; the
/// caller only learns that the notification was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Shown(DeliveryRecord),
    Scheduled(DeferredAlarm),
    Dropped,
}

impl Dispatch {
    pub fn record(&self) -> Option<&DeliveryRecord> {
        match self {
            Self::Shown(record) => Some(record),
            _ => None,
        }
    }

    pub fn alarm(&self) -> Option<&DeferredAlarm> {
        match self {
            Self::Scheduled(alarm) => Some(alarm),
            _ => None,
        }
    }
}

pub struct NotificationEngine {
    platform: Arc<dyn NotificationPlatform>,
    channels: ChannelRegistry,
    surface: DeliverySurface,
    scheduler: AlarmScheduler,
    display_ids: Arc<dyn IdSequence>,
    activations: Arc<dyn IdSequence>,
    events: EventHub,
}

pub struct NotificationEngineBuilder {
    config: EngineConfig,
    dispatcher: Option<Arc<dyn UiDispatcher>>,
    ids: Option<(Arc<dyn IdSequence>, Arc<dyn IdSequence>)>,
}

impl NotificationEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            dispatcher: None,
            ids: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn UiDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Draw ids from the given sequences instead of fresh in-memory
    /// counters seeded from the config.
    pub fn with_id_sequences(
        mut self,
        display_ids: Arc<dyn IdSequence>,
        activations: Arc<dyn IdSequence>,
    ) -> Self {
        self.ids = Some((display_ids, activations));
        self
    }

    /// Construction always attempts channel registration: on a cold start
    /// the in-memory record of an earlier registration is gone.
    pub fn build(self, platform: Arc<dyn NotificationPlatform>) -> NotificationEngine {
        let (display_ids, activations) = match self.ids {
            Some(ids) => ids,
            None => {
                let seed = self.config.counter_seed.initial_value();
                debug!(seed, "using in-memory id counters");
                let display_ids: Arc<dyn IdSequence> = Arc::new(IdCounter::starting_at(seed));
                let activations: Arc<dyn IdSequence> = Arc::new(IdCounter::starting_at(seed));
                (display_ids, activations)
            }
        };
        let surface = DeliverySurface::new(
            Arc::clone(&platform),
            self.config.channel.id.clone(),
            Arc::clone(&display_ids),
            Arc::clone(&activations),
        )
        .with_auto_cancel(self.config.auto_cancel);
        let scheduler = AlarmScheduler::new(Arc::clone(&platform), Arc::clone(&activations));
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(InlineDispatcher));

        let engine = NotificationEngine {
            platform,
            channels: ChannelRegistry::new(self.config.channel),
            surface,
            scheduler,
            display_ids,
            activations,
            events: EventHub::new(dispatcher),
        };
        let state = engine.ensure_channel();
        info!(channel = %engine.channel().id, ?state, "notification engine ready");
        engine
    }
}

impl Default for NotificationEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationEngine {
    pub fn builder() -> NotificationEngineBuilder {
        NotificationEngineBuilder::new()
    }

    pub fn channel(&self) -> &NotificationChannel {
        self.channels.channel()
    }

    pub fn ensure_channel(&self) -> ChannelState {
        self.channels.ensure(self.platform.as_ref())
    }

    /// Shows the notification now, or registers an alarm when `deliver_at`
    /// is set. A time in the past is accepted and fires as soon as the OS
    /// allows.
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub fn send(&self, request: NotificationRequest) -> Dispatch {
        self.ensure_channel();
        let NotificationRequest {
            title,
            body,
            deliver_at,
        } = request;
        let payload = NotificationPayload::new(title, body);
        match deliver_at {
            None => self.show_payload(&payload),
            Some(at) => {
                let trigger_at_millis = at.to_epoch_millis();
                match self.scheduler.schedule_at(trigger_at_millis, payload) {
                    Ok(alarm) => Dispatch::Scheduled(alarm),
                    Err(err) => {
                        warn!(%err, "notification dropped");
                        Dispatch::Dropped
                    }
                }
            }
        }
    }

    pub fn show(&self, title: impl Into<String>, body: impl Into<String>) -> Dispatch {
        self.ensure_channel();
        self.show_payload(&NotificationPayload::new(title, body))
    }

    fn show_payload(&self, payload: &NotificationPayload) -> Dispatch {
        match self.surface.show(payload) {
            Ok(record) => Dispatch::Shown(record),
            Err(err) => {
                warn!(%err, "notification dropped");
                Dispatch::Dropped
            }
        }
    }

    /// Called when the application is reopened from a notification.
    #[instrument(skip(self, title, body))]
    pub fn notify_received(&self, title: impl Into<String>, body: impl Into<String>) {
        self.events.emit(ReceivedEvent {
            title: title.into(),
            body: body.into(),
        });
    }

    pub fn subscribe(
        &self,
        handler: impl Fn(&ReceivedEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Ids the next immediate delivery and the next activation would use.
    pub fn next_ids(&self) -> Result<(DisplayId, ActivationId), PlatformError> {
        Ok((
            DisplayId(self.display_ids.upcoming()?),
            ActivationId(self.activations.upcoming()?),
        ))
    }
}

/// Holder for the process-wide engine. The first initialiser wins; later
/// attempts get the existing instance.
pub struct EngineCell {
    inner: OnceCell<Arc<NotificationEngine>>,
}

impl EngineCell {
    pub const fn new() -> Self {
        Self {
            inner: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<Arc<NotificationEngine>> {
        self.inner.get().cloned()
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> NotificationEngine) -> Arc<NotificationEngine> {
        let mut constructed = false;
        let engine = self.inner.get_or_init(|| {
            constructed = true;
            Arc::new(init())
        });
        if !constructed {
            debug!("reusing existing notification engine");
        }
        Arc::clone(engine)
    }
}

impl Default for EngineCell {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: EngineCell = EngineCell::new();

pub fn global() -> &'static EngineCell {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Importance, NotificationChannel};
    use crate::config::CounterSeed;
    use crate::memory::MemoryPlatform;
    use chrono::{Duration, Utc};

    fn engine(platform: &Arc<MemoryPlatform>) -> NotificationEngine {
        NotificationEngine::builder().build(platform.clone())
    }

    #[test]
    fn immediate_sends_get_increasing_display_ids() {
        let platform = Arc::new(MemoryPlatform::new());
        let engine = engine(&platform);
        let ids: Vec<DisplayId> = (0..5)
            .map(|n| {
                engine
                    .send(NotificationRequest::new(format!("Reminder #{n}"), "body"))
                    .record()
                    .expect("shown")
                    .display_id
            })
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(platform.posted().len(), 5);
    }

    #[test]
    fn deferred_send_shows_nothing_now() {
        let platform = Arc::new(MemoryPlatform::new());
        let engine = engine(&platform);
        let at = Utc::now() + Duration::seconds(10);
        let dispatch = engine.send(NotificationRequest::new("Reminder #2", "later").deliver_at(at));
        let alarm = dispatch.alarm().expect("scheduled");
        assert_eq!(alarm.trigger_at_millis, at.timestamp_millis());
        assert!(platform.posted().is_empty());
        assert!(platform.take_due(at.timestamp_millis() - 1).is_empty());
    }

    #[test]
    fn past_time_is_accepted() {
        let platform = Arc::new(MemoryPlatform::new());
        let engine = engine(&platform);
        let at = Utc::now() - Duration::hours(1);
        let dispatch = engine.send(NotificationRequest::new("late", "late").deliver_at(at));
        assert!(matches!(dispatch, Dispatch::Scheduled(_)));
        assert_eq!(platform.take_due(crate::time::now_millis()).len(), 1);
    }

    #[test]
    fn delivery_failure_is_reported_as_dropped() {
        let platform = Arc::new(MemoryPlatform::new());
        let engine = engine(&platform);
        platform.set_failing_posts(true);
        assert_eq!(engine.show("t", "b"), Dispatch::Dropped);
        platform.set_failing_posts(false);
        // The failed attempt still consumed its display id.
        assert_eq!(engine.show("t", "b").record().unwrap().display_id, DisplayId(1));
    }

    #[test]
    fn cell_returns_existing_engine() {
        let cell = EngineCell::new();
        let platform = Arc::new(MemoryPlatform::new());
        let first = cell.get_or_init(|| engine(&platform));
        let second = cell.get_or_init(|| panic!("must not construct twice"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(platform.create_channel_calls(), 1);
    }

    #[test]
    fn engines_on_shared_sequences_never_reuse_ids() {
        let platform = Arc::new(MemoryPlatform::new());
        let display_ids: Arc<dyn IdSequence> = Arc::new(IdCounter::default());
        let activations: Arc<dyn IdSequence> = Arc::new(IdCounter::default());
        let build = || {
            NotificationEngine::builder()
                .with_id_sequences(Arc::clone(&display_ids), Arc::clone(&activations))
                .build(platform.clone())
        };
        let first = build();
        let second = build();

        let a = first.show("A", "a").record().cloned().unwrap();
        let b = second.show("B", "b").record().cloned().unwrap();
        assert_ne!(a.display_id, b.display_id);
        assert_ne!(a.resume_code, b.resume_code);

        let at = Utc::now() + Duration::seconds(10);
        let x = first.send(NotificationRequest::new("X", "x").deliver_at(at));
        let y = second.send(NotificationRequest::new("Y", "y").deliver_at(at));
        assert_ne!(x.alarm().unwrap().id, y.alarm().unwrap().id);
        assert_eq!(platform.pending_alarms().len(), 2);
    }

    #[test]
    fn clock_seed_moves_counters_off_zero() {
        let platform = Arc::new(MemoryPlatform::new());
        let config = EngineConfig::default().with_counter_seed(CounterSeed::Clock);
        let engine = NotificationEngine::builder()
            .with_config(config)
            .build(platform.clone());

        let (display_id, activation) = engine.next_ids().unwrap();
        assert!(display_id.0 > 1_700_000_000);
        assert!(activation.0 > 1_700_000_000);
        let record = engine.show("t", "b").record().cloned().unwrap();
        assert_eq!(record.display_id, display_id);
    }

    #[test]
    fn configured_channel_is_the_one_registered() {
        let platform = Arc::new(MemoryPlatform::new());
        let channel = NotificationChannel {
            id: "reminders".into(),
            name: "Reminders".into(),
            description: "Scheduled reminders".into(),
            importance: Importance::High,
        };
        let engine = NotificationEngine::builder()
            .with_config(EngineConfig::default().with_channel(channel.clone()))
            .build(platform.clone());

        assert_eq!(engine.channel(), &channel);
        assert_eq!(platform.channels(), vec![channel]);
        assert_eq!(platform.posted().len(), 0);
        engine.show("t", "b");
        assert_eq!(platform.posted()[0].channel_id, "reminders");
    }
}
