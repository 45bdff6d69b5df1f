use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use remind_core::{
    payload::encode_extras, scheduler::DeferredAlarm, time::now_millis, TriggerHandler,
    TriggerOutcome,
};

use crate::platform::DesktopPlatform;

/// How a due alarm reaches the trigger handler.
pub enum FireMode {
    /// Call the handler in this process.
    InProcess(TriggerHandler<'static>),
    /// Run `program args.. --extras <json>` as a fresh process, with
    /// `REMIND_HOME` pointing at the daemon's state directory.
    Spawn { program: PathBuf, args: Vec<String> },
}

/// Wakes up for pending alarms and fires them once due.
pub struct AlarmDaemon {
    platform: DesktopPlatform,
    mode: FireMode,
    poll_interval: Duration,
}

impl AlarmDaemon {
    pub fn new(platform: DesktopPlatform, mode: FireMode) -> Self {
        Self {
            platform,
            mode,
            poll_interval: Duration::from_secs(30),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Fires everything due now and returns how many alarms fired.
    pub fn fire_due(&self) -> Result<usize> {
        let due = self.platform.take_due(now_millis())?;
        for alarm in &due {
            self.fire(alarm);
        }
        Ok(due.len())
    }

    fn fire(&self, alarm: &DeferredAlarm) {
        let extras = alarm.extras();
        match &self.mode {
            FireMode::InProcess(handler) => match handler.on_receive(Some(&extras)) {
                TriggerOutcome::Delivered(record) => {
                    debug!(alarm_id = %alarm.id, display_id = %record.display_id, "alarm delivered")
                }
                outcome => warn!(alarm_id = %alarm.id, ?outcome, "alarm not delivered"),
            },
            FireMode::Spawn { program, args } => {
                let status = Command::new(program)
                    .args(args)
                    .env("REMIND_HOME", self.platform.paths().root())
                    .arg("--extras")
                    .arg(encode_extras(&extras))
                    .status();
                match status {
                    Ok(status) if status.success() => {
                        debug!(alarm_id = %alarm.id, "trigger process finished")
                    }
                    Ok(status) => warn!(alarm_id = %alarm.id, %status, "trigger process failed"),
                    Err(err) => warn!(alarm_id = %alarm.id, %err, "unable to start trigger process"),
                }
            }
        }
    }

    /// Sleeps until the earliest pending alarm, the poll interval, or a
    /// change to the alarm registry, whichever comes first. Returns once
    /// `stop` is set.
    pub fn run(&self, stop: &AtomicBool) -> Result<()> {
        let root = self.platform.paths().root().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create {}", root.display()))?;

        let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(&root, RecursiveMode::NonRecursive)?;
        let alarms_file = self.platform.paths().alarms_file();
        info!(path = %root.display(), "alarm daemon started");

        while !stop.load(Ordering::Relaxed) {
            match self.fire_due() {
                Ok(0) => {}
                Ok(fired) => info!(fired, "fired due alarms"),
                Err(err) => warn!(%err, "failed to read alarm registry"),
            }

            let wait = match self.platform.next_trigger() {
                Ok(Some(at)) => {
                    let until = Duration::from_millis((at - now_millis()).max(0) as u64);
                    until.min(self.poll_interval)
                }
                _ => self.poll_interval,
            };

            match rx.recv_timeout(wait) {
                Ok(Ok(event)) => {
                    if event.paths.iter().any(|path| path == &alarms_file) {
                        debug!("alarm registry changed");
                    }
                }
                Ok(Err(err)) => warn!(%err, "watch error"),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("alarm daemon stopped");
        Ok(())
    }
}
