use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use chrono::Duration as ChronoDuration;
use parking_lot::Mutex;
use tracing::warn;

use remind_core::{
    events::ui_queue, ids::DisplayId, time::DeliverAt, Dispatch, NotificationEngine,
    NotificationRequest,
};
use remind_host::{AlarmDaemon, FireMode, Shade};

use crate::app::{install_engine, reopen_from, trigger_handler, AppConfig};

const HELP: &str = "commands: click | now | 10s | 5m | shade | tap <id> | help | quit";

/// Terminal rendition of the notification demo page.
pub struct DemoPage {
    engine: Arc<NotificationEngine>,
    shade: Shade,
    click_count: u32,
    notification_number: u32,
    received: Arc<Mutex<Vec<String>>>,
}

impl DemoPage {
    /// Subscribes once at construction; received payloads are appended as
    /// labels on the UI thread.
    pub fn new(engine: Arc<NotificationEngine>, shade: Shade) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let labels = Arc::clone(&received);
        engine.subscribe(move |event| {
            let label = format!(
                "Received notification:\nTitle: {}\nMessage: {}",
                event.title, event.body
            );
            println!("{label}");
            labels.lock().push(label);
        });
        Self {
            engine,
            shade,
            click_count: 0,
            notification_number: 0,
            received,
        }
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    pub fn click(&mut self) -> String {
        self.click_count += 1;
        format!("Clicked {} time(s)", self.click_count)
    }

    fn next_request(&mut self) -> NotificationRequest {
        self.notification_number += 1;
        let n = self.notification_number;
        NotificationRequest::new(
            format!("Local notification #{n}"),
            format!("You have received {n} notifications!"),
        )
    }

    pub fn send_now(&mut self) -> Dispatch {
        let request = self.next_request();
        self.engine.send(request)
    }

    pub fn send_in(&mut self, delay: ChronoDuration) -> Dispatch {
        let request = self.next_request().deliver_at(DeliverAt::after(delay));
        self.engine.send(request)
    }

    pub fn tap(&self, display_id: DisplayId) -> Result<bool> {
        Ok(reopen_from(&self.engine, &self.shade, display_id)?.is_some())
    }

    /// Returns `false` when the page should close.
    pub fn handle(&mut self, line: &str) -> Result<bool> {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("click") => println!("{}", self.click()),
            Some("now") => describe(&self.send_now()),
            Some("10s") => describe(&self.send_in(ChronoDuration::seconds(10))),
            Some("5m") => describe(&self.send_in(ChronoDuration::minutes(5))),
            Some("shade") => {
                for entry in self.shade.list()? {
                    let n = &entry.notification;
                    println!("[{}] {} | {}", n.display_id, n.title, n.body);
                }
            }
            Some("tap") => match parts.next().and_then(|id| id.parse::<u32>().ok()) {
                Some(id) => {
                    if !self.tap(DisplayId(id))? {
                        println!("no visible notification #{id}");
                    }
                }
                None => println!("usage: tap <id>"),
            },
            Some("quit") | Some("exit") => return Ok(false),
            Some(_) => println!("{HELP}"),
            None => {}
        }
        Ok(true)
    }
}

fn describe(dispatch: &Dispatch) {
    match dispatch {
        Dispatch::Shown(record) => println!("shown as #{}", record.display_id),
        Dispatch::Scheduled(alarm) => {
            println!("alarm #{} set for {}", alarm.id, alarm.trigger_at_millis)
        }
        Dispatch::Dropped => println!("notification dropped (see log)"),
    }
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

/// Runs the page on the current thread, which acts as the UI thread. Alarms
/// are fired by an in-process daemon; stdin is read on a helper thread.
pub fn run_demo(config: &AppConfig) -> Result<()> {
    let (dispatcher, queue) = ui_queue();
    let engine = install_engine(config, Arc::new(dispatcher));
    let mut page = DemoPage::new(Arc::clone(&engine), Shade::new(config.paths().clone()));

    let stop = Arc::new(AtomicBool::new(false));
    let daemon = AlarmDaemon::new(config.platform(), FireMode::InProcess(trigger_handler(config)))
        .with_poll_interval(Duration::from_secs(1));
    let daemon_stop = Arc::clone(&stop);
    let daemon_thread = thread::spawn(move || {
        if let Err(err) = daemon.run(&daemon_stop) {
            warn!(%err, "alarm daemon exited");
        }
    });

    let (input_tx, input_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(|line| line.ok()) {
            if input_tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("{HELP}");
    prompt()?;
    loop {
        let keep_running = match input_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => {
                let keep_running = page.handle(&line)?;
                prompt()?;
                keep_running
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        };
        queue.run_pending();
        if !keep_running {
            break;
        }
    }

    stop.store(true, Ordering::Relaxed);
    if daemon_thread.join().is_err() {
        warn!("alarm daemon panicked");
    }
    Ok(())
}
