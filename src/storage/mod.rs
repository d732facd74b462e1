//! Durable key-value storage.
//!
//! Backends implement [`KeyValueStore`] and are owned by a [`StorageWorker`]
//! thread, which serializes every read and write against them.

use std::path::Path;

use anyhow::Result;

use crate::config::StorageBackend;

mod json_file;
mod memory;
mod sqlite;
mod worker;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use worker::StorageWorker;

pub const SQLITE_FILE_NAME: &str = "qrscan.sqlite3";
pub const JSON_FILE_NAME: &str = "storage.json";

pub trait KeyValueStore: Send {
    fn get(&mut self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Open the configured backend under `data_dir` on its own worker thread.
pub fn open_backend(backend: StorageBackend, data_dir: &Path) -> Result<StorageWorker> {
    match backend {
        StorageBackend::Sqlite => {
            let path = data_dir.join(SQLITE_FILE_NAME);
            StorageWorker::spawn(backend.as_str(), move || {
                Ok(Box::new(SqliteStore::open(&path)?) as Box<dyn KeyValueStore>)
            })
        }
        StorageBackend::JsonFile => {
            let path = data_dir.join(JSON_FILE_NAME);
            StorageWorker::spawn(backend.as_str(), move || {
                Ok(Box::new(JsonFileStore::open(path)?) as Box<dyn KeyValueStore>)
            })
        }
        StorageBackend::Memory => StorageWorker::spawn(backend.as_str(), || {
            Ok(Box::new(MemoryStore::default()) as Box<dyn KeyValueStore>)
        }),
    }
}
