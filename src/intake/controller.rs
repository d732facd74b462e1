use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use log::info;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{history::HistoryStore, models::ScanRecord};

use super::{
    gate::ScanGate,
    loop_worker::{accept_scan, intake_loop},
};

/// Bridges the camera's stream of decoded payloads to the history store,
/// letting one scan through per rearm.
pub struct ScanIntake {
    history: HistoryStore,
    gate: Arc<Mutex<ScanGate>>,
    latest_tx: Arc<watch::Sender<Option<ScanRecord>>>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl ScanIntake {
    pub fn new(history: HistoryStore, rearm_delay: Option<Duration>) -> Self {
        let (latest_tx, _) = watch::channel(None);
        Self {
            history,
            gate: Arc::new(Mutex::new(ScanGate::new(rearm_delay))),
            latest_tx: Arc::new(latest_tx),
            handle: None,
            cancel_token: None,
        }
    }

    /// Start consuming `events` on a background task. Must be called from
    /// within a Tokio runtime.
    pub fn start(&mut self, events: mpsc::Receiver<String>) -> Result<()> {
        if self.handle.is_some() {
            bail!("scan intake already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(intake_loop(
            self.history.clone(),
            Arc::clone(&self.gate),
            Arc::clone(&self.latest_tx),
            events,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        info!("Scan intake started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("scan intake task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Hand over one decoded payload directly. Returns the new record, or
    /// `None` if the gate is holding.
    pub fn offer(&self, payload: impl Into<String>) -> Option<ScanRecord> {
        accept_scan(&self.history, &self.gate, &self.latest_tx, payload.into())
    }

    /// Re-open the gate ("scan again").
    pub fn rearm(&self) {
        match self.gate.lock() {
            Ok(mut gate) => gate.rearm(),
            Err(poisoned) => poisoned.into_inner().rearm(),
        }
    }

    pub fn is_holding(&self) -> bool {
        match self.gate.lock() {
            Ok(gate) => gate.is_holding(),
            Err(poisoned) => poisoned.into_inner().is_holding(),
        }
    }

    /// Most recently accepted record, for the result view.
    pub fn latest(&self) -> watch::Receiver<Option<ScanRecord>> {
        self.latest_tx.subscribe()
    }
}
