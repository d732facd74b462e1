use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{history::HistoryStore, models::ScanRecord};

use super::gate::ScanGate;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Feed decoded payloads into the history until cancelled or the camera
/// side closes its channel.
pub async fn intake_loop(
    history: HistoryStore,
    gate: Arc<Mutex<ScanGate>>,
    latest_tx: Arc<watch::Sender<Option<ScanRecord>>>,
    mut events: mpsc::Receiver<String>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_info!("scan intake loop shutting down");
                break;
            }
            event = events.recv() => {
                match event {
                    Some(payload) => {
                        accept_scan(&history, &gate, &latest_tx, payload);
                    }
                    None => {
                        log_info!("scan source closed; intake loop exiting");
                        break;
                    }
                }
            }
        }
    }
}

pub fn accept_scan(
    history: &HistoryStore,
    gate: &Mutex<ScanGate>,
    latest_tx: &watch::Sender<Option<ScanRecord>>,
    payload: String,
) -> Option<ScanRecord> {
    let accepted = match gate.lock() {
        Ok(mut guard) => guard.try_accept(),
        Err(poisoned) => poisoned.into_inner().try_accept(),
    };

    if !accepted {
        log_debug!("ignoring scan event while holding previous result");
        return None;
    }

    let record = history.add(payload);
    log_info!(
        "Accepted scan {} as {} ({} bytes)",
        record.id,
        record.category,
        record.payload.len()
    );
    latest_tx.send_replace(Some(record.clone()));
    Some(record)
}
