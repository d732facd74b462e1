use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_KEY: &str = "scan_history";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StorageBackend {
    Sqlite,
    JsonFile,
    Memory,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Sqlite
    }
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::JsonFile => "jsonFile",
            StorageBackend::Memory => "memory",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StorageBackend::Sqlite),
            "json" | "jsonfile" | "json_file" => Some(StorageBackend::JsonFile),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScannerConfig {
    pub storage: StorageBackend,
    /// Storage key the history snapshot lives under.
    pub history_key: String,
    /// Oldest records beyond this count are dropped. `None` keeps everything.
    pub max_entries: Option<usize>,
    /// Re-open the scan gate automatically after this long. `None` waits for
    /// an explicit rearm.
    pub rearm_delay_ms: Option<u64>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            history_key: DEFAULT_HISTORY_KEY.into(),
            max_entries: None,
            rearm_delay_ms: None,
        }
    }
}

impl ScannerConfig {
    /// Read settings from `path`, falling back to defaults when the file is
    /// missing, unreadable or unparseable, then apply environment overrides.
    pub fn load(path: &Path) -> Self {
        let mut config = if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                    warn!("Ignoring unparseable settings at {}: {err}", path.display());
                    ScannerConfig::default()
                }),
                Err(err) => {
                    warn!("Failed to read settings from {}: {err}", path.display());
                    ScannerConfig::default()
                }
            }
        } else {
            ScannerConfig::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn rearm_delay(&self) -> Option<Duration> {
        self.rearm_delay_ms.map(Duration::from_millis)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("QRSCAN_STORAGE") {
            match StorageBackend::parse(&value) {
                Some(backend) => self.storage = backend,
                None => warn!("Ignoring unknown QRSCAN_STORAGE value '{value}'"),
            }
        }

        if let Some(value) = lookup("QRSCAN_MAX_ENTRIES") {
            match value.trim().parse::<usize>() {
                Ok(0) => self.max_entries = None,
                Ok(limit) => self.max_entries = Some(limit),
                Err(_) => warn!("Ignoring invalid QRSCAN_MAX_ENTRIES value '{value}'"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScannerConfig::load(&dir.path().join("settings.json"));
        assert_eq!(config.history_key, DEFAULT_HISTORY_KEY);
        assert_eq!(config.max_entries, None);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"storage":"jsonFile","maxEntries":25}"#).unwrap();

        let mut config: ScannerConfig =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        config.apply_overrides(|_| None);

        assert_eq!(config.storage, StorageBackend::JsonFile);
        assert_eq!(config.max_entries, Some(25));
        assert_eq!(config.history_key, DEFAULT_HISTORY_KEY);
        assert_eq!(config.rearm_delay(), None);
    }

    #[test]
    fn test_unreadable_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json at all").unwrap();

        let config = ScannerConfig::load(&path);
        assert_eq!(config.history_key, DEFAULT_HISTORY_KEY);
    }

    #[test]
    fn test_non_utf8_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, [0xff, 0xfe, 0xfd]).unwrap();

        let config = ScannerConfig::load(&path);
        assert_eq!(config.history_key, DEFAULT_HISTORY_KEY);
        assert_eq!(config.rearm_delay_ms, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let config = ScannerConfig {
            history_key: "custom".into(),
            rearm_delay_ms: Some(1500),
            ..ScannerConfig::default()
        };
        config.save(&path).unwrap();

        let raw: ScannerConfig = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, config);
        assert_eq!(raw.rearm_delay(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([("QRSCAN_STORAGE", "memory"), ("QRSCAN_MAX_ENTRIES", "10")]);
        let mut config = ScannerConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.max_entries, Some(10));

        let env: HashMap<&str, &str> =
            HashMap::from([("QRSCAN_STORAGE", "floppy"), ("QRSCAN_MAX_ENTRIES", "lots")]);
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.max_entries, Some(10));
    }
}
