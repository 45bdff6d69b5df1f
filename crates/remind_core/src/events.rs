use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Raised when the application is reopened from a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedEvent {
    pub title: String,
    pub body: String,
}

pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Hands work to the execution context that owns the presentation layer.
pub trait UiDispatcher: Send + Sync {
    fn dispatch(&self, job: UiJob);
}

/// Runs jobs on the calling thread. For headless hosts with no UI thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn dispatch(&self, job: UiJob) {
        job();
    }
}

/// Queues jobs for a UI thread that drains the paired [`UiQueue`].
#[derive(Clone)]
pub struct QueueDispatcher {
    sender: Sender<UiJob>,
}

pub struct UiQueue {
    receiver: Receiver<UiJob>,
}

pub fn ui_queue() -> (QueueDispatcher, UiQueue) {
    let (sender, receiver) = mpsc::channel();
    (QueueDispatcher { sender }, UiQueue { receiver })
}

impl UiDispatcher for QueueDispatcher {
    fn dispatch(&self, job: UiJob) {
        if self.sender.send(job).is_err() {
            warn!("UI queue closed, dropping event");
        }
    }
}

impl UiQueue {
    /// Runs every queued job on the current thread; returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Waits up to `timeout` for the first job, then drains the rest.
    pub fn run_for(&self, timeout: Duration) -> usize {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                job();
                1 + self.run_pending()
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&ReceivedEvent) + Send + Sync>;

/// Subscriber registry for [`ReceivedEvent`]. Emission snapshots the current
/// subscribers; late subscribers get nothing and there is no replay.
pub struct EventHub {
    subscribers: RwLock<Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicU64,
    dispatcher: Arc<dyn UiDispatcher>,
}

impl EventHub {
    pub fn new(dispatcher: Arc<dyn UiDispatcher>) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            dispatcher,
        }
    }

    pub fn subscribe(&self, handler: impl Fn(&ReceivedEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn emit(&self, event: ReceivedEvent) {
        let handlers: Vec<Handler> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        trace!(subscribers = handlers.len(), "emitting received event");
        for handler in handlers {
            let event = event.clone();
            self.dispatcher.dispatch(Box::new(move || handler(&event)));
        }
    }
}
