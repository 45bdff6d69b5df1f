use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use remind_core::{
    events::ui_queue,
    ids::{ActivationId, DisplayId},
    memory::MemoryPlatform,
    payload::{Extras, NotificationPayload, TITLE_KEY},
    time::now_millis,
    Dispatch, EngineCell, NotificationEngine, NotificationRequest, TriggerHandler,
    TriggerOutcome,
};

fn handler_for<'a>(cell: &'a EngineCell, platform: &Arc<MemoryPlatform>) -> TriggerHandler<'a> {
    let platform = platform.clone();
    TriggerHandler::new(cell, move || {
        NotificationEngine::builder().build(platform.clone())
    })
}

#[test]
fn immediate_send_produces_one_record_and_no_received_event() {
    let platform = Arc::new(MemoryPlatform::new());
    let engine = NotificationEngine::builder().build(platform.clone());
    let received = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&received);
    engine.subscribe(move |_| *sink.lock() += 1);

    let dispatch = engine.send(NotificationRequest::new(
        "Reminder #1",
        "You have 1 notification",
    ));

    let record = dispatch.record().expect("delivered synchronously");
    assert_eq!(record.title, "Reminder #1");
    assert_eq!(platform.posted().len(), 1);
    assert_eq!(*received.lock(), 0);
}

#[test]
fn deferred_send_fires_through_a_cold_started_engine() {
    let platform = Arc::new(MemoryPlatform::new());
    let at = Utc::now() + Duration::seconds(10);
    {
        let engine = NotificationEngine::builder().build(platform.clone());
        let dispatch = engine.send(NotificationRequest::new("Reminder #2", "...").deliver_at(at));
        assert!(matches!(dispatch, Dispatch::Scheduled(_)));
        // The scheduling process goes away here.
    }
    assert!(platform.posted().is_empty());
    assert!(platform.take_due(at.timestamp_millis() - 1).is_empty());

    let due = platform.take_due(at.timestamp_millis());
    assert_eq!(due.len(), 1);

    let cell = EngineCell::new();
    let handler = handler_for(&cell, &platform);
    let extras = due[0].extras();
    match handler.on_receive(Some(&extras)) {
        TriggerOutcome::Delivered(record) => {
            assert_eq!(record.title, "Reminder #2");
            assert_eq!(record.body, "...");
            // Counters restart with the new process.
            assert_eq!(record.display_id, DisplayId(0));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(platform.posted().len(), 1);
}

#[test]
fn payload_without_body_is_dropped_silently() {
    let platform = Arc::new(MemoryPlatform::new());
    let cell = EngineCell::new();
    let handler = handler_for(&cell, &platform);
    let mut extras = Extras::new();
    extras.insert(TITLE_KEY.to_string(), "Reminder #3".to_string());

    assert_eq!(handler.on_receive(Some(&extras)), TriggerOutcome::Ignored);
    assert!(platform.posted().is_empty());
}

#[test]
fn alarms_for_the_same_instant_stay_independent() {
    let platform = Arc::new(MemoryPlatform::new());
    let engine = NotificationEngine::builder().build(platform.clone());
    let at = Utc::now() + Duration::minutes(5);

    let first = engine.send(NotificationRequest::new("Stretch", "now").deliver_at(at));
    let second = engine.send(NotificationRequest::new("Stretch", "now").deliver_at(at));
    let (first, second) = (first.alarm().unwrap(), second.alarm().unwrap());
    assert_ne!(first.id, second.id);

    let cell = EngineCell::new();
    let handler = handler_for(&cell, &platform);
    let records: Vec<_> = platform
        .take_due(at.timestamp_millis())
        .iter()
        .map(|alarm| match handler.on_receive(Some(&alarm.extras())) {
            TriggerOutcome::Delivered(record) => record,
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    assert_eq!(records.len(), 2);
    assert_ne!(records[0].display_id, records[1].display_id);
    assert_eq!(platform.posted().len(), 2);
}

#[test]
fn launch_and_trigger_paths_share_one_engine() {
    let platform = Arc::new(MemoryPlatform::new());
    let cell = EngineCell::new();
    let launched = cell.get_or_init(|| NotificationEngine::builder().build(platform.clone()));
    launched.send(NotificationRequest::new("first", "body"));

    let handler = handler_for(&cell, &platform);
    let extras = NotificationPayload::new("second", "body").to_extras();
    let outcome = handler.on_receive(Some(&extras));

    assert!(matches!(outcome, TriggerOutcome::Delivered(r) if r.display_id == DisplayId(1)));
    assert_eq!(platform.create_channel_calls(), 1);
}

#[test]
fn rebuilt_engine_starts_with_fresh_counters() {
    let platform = Arc::new(MemoryPlatform::new());
    let first = NotificationEngine::builder().build(platform.clone());
    first.send(NotificationRequest::new("a", "b"));
    first.send(NotificationRequest::new("a", "b").deliver_at(Utc::now()));
    assert_ne!(first.next_ids().unwrap(), (DisplayId(0), ActivationId(0)));

    let second = NotificationEngine::builder().build(platform.clone());
    assert_eq!(second.next_ids().unwrap(), (DisplayId(0), ActivationId(0)));
    assert_eq!(platform.channels().len(), 1);
}

#[test]
fn concurrent_sends_never_share_display_ids() {
    let platform = Arc::new(MemoryPlatform::new());
    let engine = Arc::new(NotificationEngine::builder().build(platform.clone()));
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                (0..50)
                    .filter_map(|n| {
                        engine
                            .send(NotificationRequest::new(format!("{worker}-{n}"), "body"))
                            .record()
                            .map(|record| record.display_id)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<DisplayId> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 200);
    assert_eq!(platform.posted().len(), 200);
    assert_eq!(platform.create_channel_calls(), 1);
}

#[test]
fn received_events_are_marshalled_onto_the_ui_queue() {
    let platform = Arc::new(MemoryPlatform::new());
    let (dispatcher, queue) = ui_queue();
    let engine = Arc::new(
        NotificationEngine::builder()
            .with_dispatcher(Arc::new(dispatcher))
            .build(platform.clone()),
    );

    let record = engine
        .send(NotificationRequest::new("Tap me", "please"))
        .record()
        .cloned()
        .unwrap();
    let extras = platform.tap(record.display_id).expect("visible");
    assert!(platform.posted().is_empty(), "auto-cancel dismisses on tap");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let ui_thread = thread::current().id();
    engine.subscribe(move |event| {
        assert_eq!(thread::current().id(), ui_thread);
        sink.lock().push((event.title.clone(), event.body.clone()));
    });

    let payload = NotificationPayload::from_extras(&extras).unwrap();
    let remote = Arc::clone(&engine);
    thread::spawn(move || remote.notify_received(payload.title, payload.body))
        .join()
        .unwrap();

    assert!(seen.lock().is_empty());
    assert_eq!(queue.run_pending(), 1);
    assert_eq!(
        *seen.lock(),
        vec![("Tap me".to_string(), "please".to_string())]
    );
}

#[test]
fn past_deliveries_fire_on_the_next_pass() {
    let platform = Arc::new(MemoryPlatform::new());
    let engine = NotificationEngine::builder().build(platform.clone());
    engine.send(NotificationRequest::new("overdue", "x").deliver_at(Utc::now() - Duration::days(1)));
    assert_eq!(platform.take_due(now_millis()).len(), 1);
}
