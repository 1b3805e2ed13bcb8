mod apdu;
mod config;
mod ndef;
mod nfc_service;
mod tag;
mod types;
mod webhook;

use clap::Parser;
use crossbeam_channel::unbounded;
use log::{error, info};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    env_logger::init();
    let config = config::Config::parse();
    info!("Starting NFC webhook service...");

    let dispatcher = match webhook::Dispatcher::new(config.http_timeout, config.dry_run) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    // Channel: NFC -> Dispatcher (Events)
    // Crossbeam (Sync) because the NFC thread blocks on PC/SC
    let (bridge_tx, bridge_rx) = unbounded::<types::TagEvent>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<types::TagEvent>();

    std::thread::spawn(move || {
        nfc_service::run(bridge_tx, config);
    });

    // Bridge thread: sync receive -> async channel
    std::thread::spawn(move || {
        while let Ok(msg) = bridge_rx.recv() {
            if event_tx.send(msg).is_err() {
                break;
            }
        }
    });

    dispatcher.run(event_rx).await;
}
