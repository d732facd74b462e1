pub mod classify;
pub mod config;
pub mod history;
pub mod intake;
pub mod models;
pub mod storage;
mod utils;
pub mod wifi;

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

pub use classify::{classify, ContentTag};
pub use config::{ScannerConfig, StorageBackend};
pub use history::{HistoryConfig, HistoryStore, LoadOutcome, PersistStatus};
pub use intake::ScanIntake;
pub use models::ScanRecord;
pub use utils::logging::init_logging;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Everything one scanning session needs. Built once and handed to the
/// screens that read or change the history.
pub struct AppState {
    pub config: ScannerConfig,
    pub history: HistoryStore,
    pub intake: ScanIntake,
}

impl AppState {
    /// Open (or create) the app data under `data_dir` and load the stored history.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = ScannerConfig::load(&data_dir.join(SETTINGS_FILE_NAME));
        Self::open_with_config(data_dir, config).await
    }

    pub async fn open_with_config(data_dir: &Path, config: ScannerConfig) -> Result<Self> {
        let storage = storage::open_backend(config.storage, data_dir)?;
        let history = HistoryStore::new(storage, HistoryConfig::from(&config));

        let outcome = history.initialize().await;
        info!(
            "Scan history opened from {} ({:?}, {} records)",
            data_dir.display(),
            outcome,
            history.len()
        );

        let intake = ScanIntake::new(history.clone(), config.rearm_delay());

        Ok(Self {
            config,
            history,
            intake,
        })
    }
}
