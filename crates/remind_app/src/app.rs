use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use remind_core::{
    config::EngineConfig,
    engine,
    events::{InlineDispatcher, ReceivedEvent, UiDispatcher},
    ids::DisplayId,
    payload::{decode_extras, NotificationPayload},
    Dispatch, NotificationEngine, NotificationRequest, TriggerHandler, TriggerOutcome,
};
use remind_host::{AlarmDaemon, DesktopPlatform, FireMode, HostPaths, Shade, ShadeEntry};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) paths: HostPaths,
    pub(crate) engine: EngineConfig,
    pub(crate) poll_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self {
            paths: HostPaths::from_env(),
            engine: EngineConfig::from_env(),
            ..Self::default()
        };
        if let Ok(secs) = std::env::var("REMIND_POLL_SECS") {
            match parse_poll_secs(&secs) {
                Ok(interval) => config.poll_interval = interval,
                Err(err) => warn!(%err, "ignoring REMIND_POLL_SECS"),
            }
        }
        info!(home = %config.paths.root().display(), "configuration loaded");
        config
    }

    pub fn with_home(mut self, paths: HostPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }

    pub fn platform(&self) -> DesktopPlatform {
        DesktopPlatform::new(self.paths.clone())
    }

    pub(crate) fn build_engine(&self, dispatcher: Arc<dyn UiDispatcher>) -> NotificationEngine {
        let platform = self.platform();
        platform
            .engine_builder()
            .with_config(self.engine.clone())
            .with_dispatcher(dispatcher)
            .build(Arc::new(platform))
    }
}

fn parse_poll_secs(raw: &str) -> Result<Duration, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err("poll interval must be positive".to_owned()),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(err) => Err(format!("invalid poll interval `{}`: {err}", raw.trim())),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: HostPaths::new(".remind"),
            engine: EngineConfig::default(),
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Ordinary launch path: the process-wide engine, created on first use.
pub fn install_engine(
    config: &AppConfig,
    dispatcher: Arc<dyn UiDispatcher>,
) -> Arc<NotificationEngine> {
    engine::global().get_or_init(|| config.build_engine(dispatcher))
}

/// Handler for alarms fired in this process; it shares the global engine
/// with the launch path.
pub fn trigger_handler(config: &AppConfig) -> TriggerHandler<'static> {
    let config = config.clone();
    TriggerHandler::new(engine::global(), move || {
        config.build_engine(Arc::new(InlineDispatcher))
    })
}

/// Parses `YYYY-MM-DD HH:MM[:SS]` (or `T` separated) as local wall-clock time.
pub fn parse_local_time(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .with_context(|| format!("unrecognised local time `{raw}`"))
}

pub fn send(config: &AppConfig, request: NotificationRequest) -> Dispatch {
    install_engine(config, Arc::new(InlineDispatcher)).send(request)
}

/// Entry point for an alarm delivered to a fresh process. Undecodable
/// extras are dropped without touching the engine.
pub fn fire_with(handler: &TriggerHandler<'_>, raw_extras: Option<&str>) -> TriggerOutcome {
    let extras = match raw_extras.map(decode_extras).transpose() {
        Ok(extras) => extras,
        Err(err) => {
            debug!(%err, "discarding trigger");
            return TriggerOutcome::Ignored;
        }
    };
    handler.on_receive(extras.as_ref())
}

pub fn fire(config: &AppConfig, raw_extras: Option<&str>) -> TriggerOutcome {
    fire_with(&trigger_handler(config), raw_extras)
}

pub fn run_alarmd(config: &AppConfig, once: bool, in_process: bool) -> Result<()> {
    let mode = if in_process {
        FireMode::InProcess(trigger_handler(config))
    } else {
        let program = std::env::current_exe().context("cannot locate the remind executable")?;
        FireMode::Spawn {
            program,
            args: vec!["fire".to_owned()],
        }
    };
    let daemon = AlarmDaemon::new(config.platform(), mode).with_poll_interval(config.poll_interval);
    if once {
        let fired = daemon.fire_due()?;
        info!(fired, "alarm pass complete");
        return Ok(());
    }
    daemon.run(&AtomicBool::new(false))
}

pub fn list_shade(config: &AppConfig) -> Result<Vec<ShadeEntry>> {
    Shade::new(config.paths.clone()).list()
}

/// Resumption path: the user tapped a notification and the app reopens
/// with its payload.
pub fn reopen_from(
    engine: &NotificationEngine,
    shade: &Shade,
    display_id: DisplayId,
) -> Result<Option<ReceivedEvent>> {
    let Some(extras) = shade.tap(display_id)? else {
        return Ok(None);
    };
    let Ok(payload) = NotificationPayload::from_extras(&extras) else {
        return Ok(None);
    };
    engine.notify_received(payload.title.clone(), payload.body.clone());
    Ok(Some(ReceivedEvent {
        title: payload.title,
        body: payload.body,
    }))
}
