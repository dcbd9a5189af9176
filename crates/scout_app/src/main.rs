mod config;
mod console;
mod logging;

use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use scout_engine::{ChannelCycleSink, CredentialStore, PollEvent, TaskDesk};
use scout_logging::scout_info;

use config::{ScoutConfig, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = ScoutConfig::load(&config_path)?;
    config.apply_env(|key| std::env::var(key).ok());

    logging::initialize(config.log_destination, config.log_level.into());
    config.validate()?;
    scout_info!("Using listing {}", config.listing_url);

    let (event_tx, event_rx) = mpsc::channel();
    spawn_event_printer(event_rx);

    let desk = TaskDesk::connect(
        config.desk_config(),
        config.fetch_settings(),
        Arc::new(CredentialStore::new(config.headers())),
        Arc::new(ChannelCycleSink::new(event_tx)),
    )?;
    if config.auto_start {
        desk.start_polling();
    }

    console::run(&desk).await
}

fn spawn_event_printer(event_rx: mpsc::Receiver<PollEvent>) {
    thread::spawn(move || {
        while let Ok(event) = event_rx.recv() {
            match event {
                PollEvent::CycleCompleted { cycle, records } => {
                    let json = serde_json::to_string(&records).unwrap_or_default();
                    println!("[cycle {cycle}] {json}");
                }
                PollEvent::CycleFailed { cycle, error } => {
                    println!("[cycle {cycle}] failed: {}", error.kind);
                }
                PollEvent::Suspended { reason, .. } => {
                    println!("polling suspended ({reason}); update the cookie and `start` again");
                }
            }
        }
    });
}
