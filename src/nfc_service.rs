// src/nfc_service.rs
use crossbeam_channel::Sender;
use log::{debug, error, info};
use pcsc::{Context, PNP_NOTIFICATION, Protocols, ReaderState, Scope, ShareMode, State};
use std::ffi::CStr;
use std::time::Duration;

use crate::config::Config;
use crate::types::TagEvent;
use crate::{apdu, ndef, tag};

/// Polls PC/SC readers until the event receiver goes away. Reader faults
/// are logged and retried after `retry_backoff`.
pub fn run(tx: Sender<TagEvent>, config: Config) {
    info!("Starting NFC Service (Event Driven)...");

    loop {
        match watch_readers(&tx, &config) {
            Ok(()) => {
                info!("Event receiver dropped, stopping NFC service");
                return;
            }
            Err(err) => {
                error!("PCSC Error: {}", err);
                if tx.send(TagEvent::ReaderStatus { connected: false }).is_err() {
                    return;
                }
                std::thread::sleep(config.retry_backoff);
            }
        }
    }
}

// Returns Ok once the receiver is gone, Err on a fault that needs a fresh context
fn watch_readers(tx: &Sender<TagEvent>, config: &Config) -> Result<(), pcsc::Error> {
    let ctx = Context::establish(Scope::User)?;

    let mut readers_buf = [0; 2048];
    let mut reader_states = vec![ReaderState::new(PNP_NOTIFICATION(), State::UNAWARE)];
    refresh_readers(&ctx, config, &mut readers_buf, &mut reader_states);

    loop {
        // 1. Wait for State Change
        match ctx.get_status_change(Duration::from_millis(500), &mut reader_states) {
            Ok(()) | Err(pcsc::Error::Timeout) => {}
            // Fired when the last reader is unplugged
            Err(pcsc::Error::NoReadersAvailable) => {}
            Err(err) => return Err(err),
        }

        // 2. PROCESS EVENTS
        let mut readers_changed = false;

        // Check PnP (Index 0)
        if reader_states[0].event_state().intersects(State::CHANGED) {
            info!("Hardware change detected");
            readers_changed = true;
            reader_states[0].sync_current_state();
        }

        // Check Readers (Indices 1..)
        for rs in reader_states.iter_mut().skip(1) {
            let event = rs.event_state();
            if !event.intersects(State::CHANGED) {
                continue;
            }

            // Card Inserted
            if event.intersects(State::PRESENT) && !rs.current_state().intersects(State::PRESENT) {
                info!("Card Inserted on {:?}", rs.name());
                let msg = handle_card_insertion(&ctx, rs.name(), config);
                if tx.send(msg).is_err() {
                    return Ok(());
                }
                std::thread::sleep(config.cooldown);
            }

            // Card Removed
            if event.intersects(State::EMPTY) && rs.current_state().intersects(State::PRESENT) {
                info!("Card Removed from {:?}", rs.name());
                if tx.send(TagEvent::TagRemoved).is_err() {
                    return Ok(());
                }
            }

            rs.sync_current_state();
        }

        // 3. REFRESH LIST
        if readers_changed {
            let connected = refresh_readers(&ctx, config, &mut readers_buf, &mut reader_states);
            if tx.send(TagEvent::ReaderStatus { connected }).is_err() {
                return Ok(());
            }
        }
    }
}

// Keeps the PnP state (index 0) and re-adds one state per accepted reader
fn refresh_readers(
    ctx: &Context,
    config: &Config,
    readers_buf: &mut [u8],
    reader_states: &mut Vec<ReaderState>,
) -> bool {
    reader_states.truncate(1);
    match ctx.list_readers(readers_buf) {
        Ok(names) => {
            for name in names {
                if config.accepts_reader(&name.to_string_lossy()) {
                    info!("Using reader {:?}", name);
                    reader_states.push(ReaderState::new(name, State::UNAWARE));
                }
            }
        }
        Err(err) => debug!("No readers listed: {}", err),
    }
    reader_states.len() > 1
}

fn handle_card_insertion(ctx: &Context, reader_name: &CStr, config: &Config) -> TagEvent {
    let card = match ctx.connect(reader_name, ShareMode::Shared, Protocols::ANY) {
        Ok(card) => card,
        Err(e) => {
            error!("Failed to connect to card: {}", e);
            return TagEvent::TagReadError {
                uid: "unknown".into(),
                error: e.to_string(),
            };
        }
    };

    let uid = match apdu::get_uid(&card) {
        Ok(uid) => hex::encode(uid),
        Err(_) => "unknown".into(),
    };
    info!("Tag found! UID: {}", uid);

    let raw = match tag::read_user_memory(&card, config.pages()) {
        Ok(raw) => raw,
        Err(e) => {
            return TagEvent::TagReadError {
                uid,
                error: e.to_string(),
            };
        }
    };
    let ndef_data = tag::truncate_at_terminator(&raw);
    debug!("Tag {} memory: {}", uid, hex::encode(ndef_data));

    match ndef::decode_ndef_uri(ndef_data) {
        Some(uri) => TagEvent::TagRead { uid, uri },
        None => {
            if let Err(e) = ndef::parse_uri_record(ndef_data) {
                debug!("Tag {}: {}", uid, e);
            }
            TagEvent::NoUriRecord { uid }
        }
    }
}
