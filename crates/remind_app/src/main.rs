use anyhow::{bail, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use remind_app::{
    app::{self, AppConfig},
    demo,
};
use remind_core::{
    events::{InlineDispatcher, ReceivedEvent},
    ids::DisplayId,
    time::DeliverAt,
    Dispatch, NotificationRequest, TriggerOutcome,
};
use remind_host::Shade;

#[derive(Parser)]
#[command(name = "remind")]
#[command(about = "Local notification scheduling and delivery")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a notification now, or schedule it
    Send {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        /// Delay in seconds
        #[arg(long = "in", conflicts_with = "at")]
        in_secs: Option<i64>,
        /// Local wall-clock time, `YYYY-MM-DD HH:MM[:SS]`
        #[arg(long)]
        at: Option<String>,
    },
    /// Deliver a fired alarm (invoked by the alarm daemon)
    Fire {
        /// JSON extras registered with the alarm
        #[arg(long)]
        extras: Option<String>,
    },
    /// Fire pending alarms as they come due
    Alarmd {
        /// Fire what is due now and exit
        #[arg(long)]
        once: bool,
        /// Deliver in this process instead of spawning `remind fire`
        #[arg(long)]
        in_process: bool,
    },
    /// List visible notifications
    Shade {
        #[arg(long)]
        json: bool,
    },
    /// Open the app from a visible notification
    Tap { display_id: u32 },
    /// Interactive notification demo page
    Demo,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Send {
            title,
            body,
            in_secs,
            at,
        } => {
            let mut request = NotificationRequest::new(title, body);
            if let Some(secs) = in_secs {
                request = request.deliver_at(DeliverAt::after(Duration::seconds(secs)));
            } else if let Some(at) = at {
                request = request.deliver_at(app::parse_local_time(&at)?);
            }
            match app::send(&config, request) {
                Dispatch::Shown(record) => println!("{}", serde_json::to_string(&record)?),
                Dispatch::Scheduled(alarm) => println!("{}", serde_json::to_string(&alarm)?),
                Dispatch::Dropped => bail!("notification was dropped"),
            }
        }
        Commands::Fire { extras } => {
            // A fired alarm never fails the process; the outcome is logged.
            if let TriggerOutcome::Delivered(record) = app::fire(&config, extras.as_deref()) {
                tracing::info!(display_id = %record.display_id, "alarm delivered");
            }
        }
        Commands::Alarmd { once, in_process } => app::run_alarmd(&config, once, in_process)?,
        Commands::Shade { json } => {
            let entries = app::list_shade(&config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("no notifications");
            } else {
                for entry in entries {
                    let n = entry.notification;
                    println!("[{}] {} | {}", n.display_id, n.title, n.body);
                }
            }
        }
        Commands::Tap { display_id } => {
            let engine = app::install_engine(&config, std::sync::Arc::new(InlineDispatcher));
            engine.subscribe(|event: &ReceivedEvent| {
                println!(
                    "Received notification:\nTitle: {}\nMessage: {}",
                    event.title, event.body
                );
            });
            let shade = Shade::new(config.paths().clone());
            if app::reopen_from(&engine, &shade, DisplayId(display_id))?.is_none() {
                bail!("no visible notification #{display_id}");
            }
        }
        Commands::Demo => demo::run_demo(&config)?,
    }
    Ok(())
}
