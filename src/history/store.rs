use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::{
    config::{ScannerConfig, DEFAULT_HISTORY_KEY},
    models::ScanRecord,
    storage::StorageWorker,
};

use super::snapshot;

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub storage_key: String,
    pub max_entries: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_HISTORY_KEY.into(),
            max_entries: None,
        }
    }
}

impl From<&ScannerConfig> for HistoryConfig {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            storage_key: config.history_key.clone(),
            max_entries: config.max_entries,
        }
    }
}

/// Progress of durable writes, in terms of in-memory revisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistStatus {
    /// Latest revision a write was attempted for, successful or not.
    pub attempted_revision: u64,
    pub saved_revision: u64,
    /// Error from the latest attempt; cleared by the next successful write.
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored { records: usize },
    Empty,
    /// Stored history could not be read or decoded and was ignored.
    Unreadable,
    AlreadyLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Pending,
    Loading,
    Ready,
}

/// Puts the load back to `Pending` if the `initialize` future that claimed it
/// is dropped before finishing, so a later call can retry.
struct LoadClaim<'a> {
    load_tx: &'a watch::Sender<LoadPhase>,
    finished: bool,
}

impl Drop for LoadClaim<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Scan history load was abandoned before completing");
            self.load_tx.send_replace(LoadPhase::Pending);
        }
    }
}

struct PendingWrite {
    revision: u64,
    records: Vec<ScanRecord>,
}

struct HistoryState {
    /// Newest first.
    records: Vec<ScanRecord>,
    revision: u64,
    queued_revision: u64,
    ready: bool,
    changed_before_ready: bool,
    /// Set by `clear` before the load; the stored history is then discarded.
    cleared_before_ready: bool,
    /// Ids removed before the load that may only exist in storage.
    removed_before_ready: HashSet<String>,
}

struct HistoryInner {
    state: RwLock<HistoryState>,
    storage: StorageWorker,
    config: HistoryConfig,
    pending: Arc<Mutex<Option<PendingWrite>>>,
    persist_tx: Arc<watch::Sender<PersistStatus>>,
    changes_tx: watch::Sender<u64>,
    load_tx: watch::Sender<LoadPhase>,
}

/// Owner of the scan history. Clones are handles to the same history.
///
/// Mutations apply to memory immediately and return; the durable write runs on
/// the storage thread afterwards. Writes are coalesced through one pending
/// slot so storage always converges on the latest in-memory snapshot.
#[derive(Clone)]
pub struct HistoryStore {
    inner: Arc<HistoryInner>,
}

impl HistoryStore {
    pub fn new(storage: StorageWorker, mut config: HistoryConfig) -> Self {
        config.max_entries = config.max_entries.filter(|limit| *limit > 0);

        let (persist_tx, _) = watch::channel(PersistStatus::default());
        let (changes_tx, _) = watch::channel(0);
        let (load_tx, _) = watch::channel(LoadPhase::Pending);

        Self {
            inner: Arc::new(HistoryInner {
                state: RwLock::new(HistoryState {
                    records: Vec::new(),
                    revision: 0,
                    queued_revision: 0,
                    ready: false,
                    changed_before_ready: false,
                    cleared_before_ready: false,
                    removed_before_ready: HashSet::new(),
                }),
                storage,
                config,
                pending: Arc::new(Mutex::new(None)),
                persist_tx: Arc::new(persist_tx),
                changes_tx,
                load_tx,
            }),
        }
    }

    /// Load the stored history. Missing, unreadable or undecodable snapshots
    /// leave the history empty; nothing here is fatal. Records added before
    /// the load finished stay in front of the loaded ones, and a `clear` or
    /// `remove` issued before then also applies to the loaded records.
    ///
    /// Dropping the returned future before it completes leaves the store
    /// unloaded; the next call starts the load again.
    pub async fn initialize(&self) -> LoadOutcome {
        loop {
            let mut claimed = false;
            self.inner.load_tx.send_if_modified(|phase| {
                if *phase == LoadPhase::Pending {
                    *phase = LoadPhase::Loading;
                    claimed = true;
                }
                claimed
            });
            if claimed {
                break;
            }

            let mut load_rx = self.inner.load_tx.subscribe();
            let phase = match load_rx.wait_for(|phase| *phase != LoadPhase::Loading).await {
                Ok(phase) => *phase,
                Err(_) => LoadPhase::Ready,
            };
            if phase == LoadPhase::Ready {
                return LoadOutcome::AlreadyLoaded;
            }
        }

        let mut claim = LoadClaim {
            load_tx: &self.inner.load_tx,
            finished: false,
        };

        let key = self.inner.config.storage_key.clone();
        let fetched = self
            .inner
            .storage
            .execute(move |store| store.get(&key))
            .await;

        let (loaded, outcome) = match fetched {
            Ok(Some(raw)) => match snapshot::decode(&raw) {
                Ok(records) => {
                    let count = records.len();
                    (records, LoadOutcome::Restored { records: count })
                }
                Err(err) => {
                    warn!("Discarding unreadable scan history: {err:#}");
                    (Vec::new(), LoadOutcome::Unreadable)
                }
            },
            Ok(None) => (Vec::new(), LoadOutcome::Empty),
            Err(err) => {
                warn!("Failed to read scan history, starting empty: {err:#}");
                (Vec::new(), LoadOutcome::Unreadable)
            }
        };

        let revision = {
            let mut state = self.write_state();

            let loaded_count = loaded.len();
            let loaded: Vec<ScanRecord> = if state.cleared_before_ready {
                Vec::new()
            } else {
                loaded
                    .into_iter()
                    .filter(|record| !state.removed_before_ready.contains(&record.id))
                    .collect()
            };
            let dropped_loaded = loaded.len() < loaded_count;
            state.cleared_before_ready = false;
            state.removed_before_ready.clear();

            let mut merged = std::mem::take(&mut state.records);
            let known: HashSet<String> = merged.iter().map(|record| record.id.clone()).collect();
            merged.extend(loaded.into_iter().filter(|record| !known.contains(&record.id)));

            let before_limit = merged.len();
            self.enforce_limit(&mut merged);
            let trimmed = merged.len() < before_limit;

            state.records = merged;
            state.ready = true;
            state.revision += 1;

            let changed_before_ready = std::mem::replace(&mut state.changed_before_ready, false);
            if changed_before_ready || dropped_loaded || trimmed {
                self.schedule_persist(&mut state);
            }
            state.revision
        };

        claim.finished = true;
        self.inner.changes_tx.send_replace(revision);
        self.inner.load_tx.send_replace(LoadPhase::Ready);
        info!(
            "Scan history ready ({:?}) using {} storage",
            outcome,
            self.inner.storage.backend()
        );

        outcome
    }

    /// Record a scan. The payload is stored exactly as given.
    pub fn add(&self, payload: impl Into<String>) -> ScanRecord {
        let record = ScanRecord::capture(payload.into());

        let revision = {
            let mut state = self.write_state();
            state.records.insert(0, record.clone());
            self.enforce_limit(&mut state.records);
            self.commit(&mut state)
        };

        self.inner.changes_tx.send_replace(revision);
        debug!("Added scan {} ({})", record.id, record.category);
        record
    }

    /// Remove a record by id. Unknown ids are a no-op and return `false`.
    ///
    /// Before the stored history is loaded the id is also remembered and
    /// dropped from the loaded records; the return value then only reflects
    /// records already in memory.
    pub fn remove(&self, id: &str) -> bool {
        let revision = {
            let mut state = self.write_state();
            if !state.ready {
                state.removed_before_ready.insert(id.to_string());
            }
            let before = state.records.len();
            state.records.retain(|record| record.id != id);
            if state.records.len() == before {
                return false;
            }
            self.commit(&mut state)
        };

        self.inner.changes_tx.send_replace(revision);
        debug!("Removed scan {id}");
        true
    }

    pub fn clear(&self) {
        let revision = {
            let mut state = self.write_state();
            state.records.clear();
            if !state.ready {
                state.cleared_before_ready = true;
                state.removed_before_ready.clear();
            }
            self.commit(&mut state)
        };

        self.inner.changes_tx.send_replace(revision);
        debug!("Cleared scan history");
    }

    /// Snapshot of the history, newest first.
    pub fn history(&self) -> Vec<ScanRecord> {
        self.read_state().records.clone()
    }

    pub fn get(&self, id: &str) -> Option<ScanRecord> {
        self.read_state()
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.read_state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().records.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        !self.read_state().ready
    }

    pub async fn wait_until_ready(&self) {
        let mut load_rx = self.inner.load_tx.subscribe();
        let _ = load_rx.wait_for(|phase| *phase == LoadPhase::Ready).await;
    }

    /// Receives the history revision after every in-memory change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes_tx.subscribe()
    }

    pub fn persist_status(&self) -> PersistStatus {
        self.inner.persist_tx.borrow().clone()
    }

    /// Wait until every mutation so far has had a durable write attempted.
    /// Returns the error of that attempt if it failed.
    ///
    /// Mutations made before `initialize` completes are not written until the
    /// load finishes, so before then this returns immediately without waiting
    /// for them.
    pub async fn flush(&self) -> Result<()> {
        let target = self.read_state().queued_revision;
        let mut status_rx = self.inner.persist_tx.subscribe();

        let status = status_rx
            .wait_for(|status| status.attempted_revision >= target)
            .await
            .map_err(|_| anyhow!("persistence status channel closed"))?
            .clone();

        if status.saved_revision >= target {
            Ok(())
        } else {
            Err(anyhow!(status
                .last_error
                .unwrap_or_else(|| format!("scan history revision {target} was not saved"))))
        }
    }

    fn commit(&self, state: &mut HistoryState) -> u64 {
        state.revision += 1;
        if state.ready {
            self.schedule_persist(state);
        } else {
            // Writing now would clobber the stored history before it is loaded.
            state.changed_before_ready = true;
        }
        state.revision
    }

    fn schedule_persist(&self, state: &mut HistoryState) {
        let revision = state.revision;
        state.queued_revision = revision;
        *lock(&self.inner.pending) = Some(PendingWrite {
            revision,
            records: state.records.clone(),
        });

        let pending = Arc::clone(&self.inner.pending);
        let persist_tx = Arc::clone(&self.inner.persist_tx);
        let key = self.inner.config.storage_key.clone();

        let submitted = self.inner.storage.submit(move |store| {
            // An earlier task may already have written the latest snapshot.
            let Some(write) = lock(&pending).take() else {
                return;
            };
            let result =
                snapshot::encode(&write.records).and_then(|encoded| store.set(&key, &encoded));
            record_attempt(&persist_tx, write.revision, result);
        });

        if let Err(err) = submitted {
            lock(&self.inner.pending).take();
            record_attempt(&self.inner.persist_tx, revision, Err(err));
        }
    }

    fn enforce_limit(&self, records: &mut Vec<ScanRecord>) {
        if let Some(limit) = self.inner.config.max_entries {
            records.truncate(limit);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, HistoryState> {
        match self.inner.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, HistoryState> {
        match self.inner.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn record_attempt(persist_tx: &watch::Sender<PersistStatus>, revision: u64, result: Result<()>) {
    match &result {
        Ok(()) => debug!("Persisted scan history revision {revision}"),
        Err(err) => error!("Failed to persist scan history revision {revision}: {err:#}"),
    }

    persist_tx.send_modify(|status| {
        status.attempted_revision = status.attempted_revision.max(revision);
        match result {
            Ok(()) => {
                status.saved_revision = revision;
                status.last_error = None;
            }
            Err(err) => status.last_error = Some(format!("{err:#}")),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::ContentTag,
        storage::{KeyValueStore, MemoryStore},
    };
    use anyhow::bail;
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    const KEY: &str = DEFAULT_HISTORY_KEY;

    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_reads: Arc<AtomicBool>,
        fail_writes: Arc<AtomicBool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&mut self, key: &str) -> Result<Option<String>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                bail!("storage offline");
            }
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                bail!("disk full");
            }
            self.inner.set(key, value)
        }
    }

    fn store_over<S>(backend: &S, config: HistoryConfig) -> HistoryStore
    where
        S: KeyValueStore + Clone + 'static,
    {
        let handle = backend.clone();
        let worker = StorageWorker::spawn("test", move || {
            Ok(Box::new(handle) as Box<dyn KeyValueStore>)
        })
        .unwrap();
        HistoryStore::new(worker, config)
    }

    async fn ready_store(memory: &MemoryStore) -> HistoryStore {
        let store = store_over(memory, HistoryConfig::default());
        store.initialize().await;
        store
    }

    fn stored(memory: &MemoryStore) -> Vec<ScanRecord> {
        snapshot::decode(&memory.value(KEY).expect("snapshot written")).unwrap()
    }

    #[tokio::test]
    async fn test_add_prepends_untouched_payload() {
        let memory = MemoryStore::default();
        let store = ready_store(&memory).await;

        let first = store.add("first");
        let second = store.add("  https://example.com  ");

        assert_eq!(second.payload, "  https://example.com  ");
        assert_eq!(second.category, ContentTag::Url);
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], second);
        assert_eq!(history[1], first);
    }

    #[tokio::test]
    async fn test_scenario_categories() {
        let memory = MemoryStore::default();
        let store = ready_store(&memory).await;

        let cases = [
            ("https://example.com", ContentTag::Url),
            ("WIFI:T:WPA;S:MyNet;P:pass;;", ContentTag::Wifi),
            ("john@x.co", ContentTag::Email),
            ("+1 555-123-4567", ContentTag::Phone),
            ("hello world", ContentTag::Text),
            ("", ContentTag::Unknown),
        ];
        for (payload, expected) in cases {
            let record = store.add(payload);
            assert_eq!(record.category, expected, "{payload}");
            assert_eq!(store.history()[0].id, record.id);
        }
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let memory = MemoryStore::default();
        let store = ready_store(&memory).await;

        let keep = store.add("keep me");
        let drop_me = store.add("drop me");
        assert!(store.remove(&drop_me.id));
        store.flush().await.unwrap();

        assert_eq!(stored(&memory), vec![keep]);
        assert_eq!(store.history(), stored(&memory));
    }

    #[tokio::test]
    async fn test_remove_present_and_absent() {
        let memory = MemoryStore::default();
        let store = ready_store(&memory).await;
        let a = store.add("a");
        let b = store.add("b");

        assert!(store.remove(&a.id));
        assert_eq!(store.len(), 1);
        assert!(store.get(&a.id).is_none());

        let before = store.history();
        let revision = *store.subscribe().borrow();
        assert!(!store.remove("no-such-id"));
        assert!(!store.remove(&a.id));
        assert_eq!(store.history(), before);
        assert_eq!(*store.subscribe().borrow(), revision);
        assert_eq!(store.get(&b.id), Some(b));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let memory = MemoryStore::default();
        let store = ready_store(&memory).await;
        for i in 0..5 {
            store.add(format!("scan {i}"));
        }

        store.clear();
        assert!(store.is_empty());
        store.clear();
        assert!(store.is_empty());

        store.flush().await.unwrap();
        assert!(stored(&memory).is_empty());
    }

    #[tokio::test]
    async fn test_initialize_restores_snapshot() {
        let memory = MemoryStore::default();
        let original = {
            let store = ready_store(&memory).await;
            store.add("one");
            store.add("two@example.com");
            store.flush().await.unwrap();
            store.history()
        };

        let reopened = store_over(&memory, HistoryConfig::default());
        assert!(reopened.is_loading());
        assert_eq!(
            reopened.initialize().await,
            LoadOutcome::Restored { records: 2 }
        );
        assert!(!reopened.is_loading());
        assert_eq!(reopened.history(), original);
    }

    #[tokio::test]
    async fn test_initialize_without_snapshot_is_empty() {
        let memory = MemoryStore::default();
        let store = store_over(&memory, HistoryConfig::default());
        assert_eq!(store.initialize().await, LoadOutcome::Empty);
        assert!(store.is_empty());
        assert!(memory.value(KEY).is_none());
    }

    #[tokio::test]
    async fn test_initialize_discards_malformed_snapshot() {
        let memory = MemoryStore::default();
        memory.insert(KEY, "{definitely not a history");
        let store = store_over(&memory, HistoryConfig::default());

        assert_eq!(store.initialize().await, LoadOutcome::Unreadable);
        assert!(store.is_empty());
        assert!(!store.is_loading());

        store.add("fresh");
        store.flush().await.unwrap();
        assert_eq!(stored(&memory).len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_read_failure_starts_empty() {
        let flaky = FlakyStore::default();
        flaky.fail_reads.store(true, Ordering::SeqCst);
        let store = store_over(&flaky, HistoryConfig::default());

        assert_eq!(store.initialize().await, LoadOutcome::Unreadable);
        assert!(store.is_empty());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_initialize_twice() {
        let memory = MemoryStore::default();
        let store = ready_store(&memory).await;
        store.add("x");
        assert_eq!(store.initialize().await, LoadOutcome::AlreadyLoaded);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_adds_before_ready_merge_in_front() {
        let memory = MemoryStore::default();
        let older = {
            let store = ready_store(&memory).await;
            let record = store.add("older");
            store.flush().await.unwrap();
            record
        };

        let store = store_over(&memory, HistoryConfig::default());
        let early = store.add("early");
        // nothing may be written until the stored history has been read
        store.flush().await.unwrap();
        assert_eq!(stored(&memory), vec![older.clone()]);
        assert_eq!(store.persist_status().attempted_revision, 0);

        assert_eq!(store.initialize().await, LoadOutcome::Restored { records: 1 });
        assert_eq!(store.history(), vec![early.clone(), older.clone()]);

        store.flush().await.unwrap();
        assert_eq!(stored(&memory), vec![early, older]);
    }

    #[tokio::test]
    async fn test_clear_before_ready_discards_stored_history() {
        let memory = MemoryStore::default();
        {
            let store = ready_store(&memory).await;
            store.add("one");
            store.add("two");
            store.flush().await.unwrap();
        }

        let store = store_over(&memory, HistoryConfig::default());
        store.clear();
        let late = store.add("after clear");

        assert_eq!(store.initialize().await, LoadOutcome::Restored { records: 2 });
        assert_eq!(store.history(), vec![late.clone()]);

        store.flush().await.unwrap();
        assert_eq!(stored(&memory), vec![late]);
    }

    #[tokio::test]
    async fn test_remove_before_ready_applies_to_stored_history() {
        let memory = MemoryStore::default();
        let (gone, kept) = {
            let store = ready_store(&memory).await;
            let kept = store.add("kept");
            let gone = store.add("gone");
            store.flush().await.unwrap();
            (gone, kept)
        };

        let store = store_over(&memory, HistoryConfig::default());
        // not in memory yet, so nothing to report
        assert!(!store.remove(&gone.id));

        store.initialize().await;
        assert_eq!(store.history(), vec![kept.clone()]);

        store.flush().await.unwrap();
        assert_eq!(stored(&memory), vec![kept]);
    }

    #[tokio::test]
    async fn test_cancelled_initialize_can_be_retried() {
        let memory = MemoryStore::default();
        let older = {
            let store = ready_store(&memory).await;
            let record = store.add("older");
            store.flush().await.unwrap();
            record
        };

        let store = store_over(&memory, HistoryConfig::default());
        store
            .inner
            .storage
            .submit(|_| std::thread::sleep(Duration::from_millis(200)))
            .unwrap();

        let abandoned = tokio::time::timeout(Duration::from_millis(20), store.initialize()).await;
        assert!(abandoned.is_err());
        assert!(store.is_loading());

        let outcome = tokio::time::timeout(Duration::from_secs(5), store.initialize())
            .await
            .expect("retry finishes");
        assert_eq!(outcome, LoadOutcome::Restored { records: 1 });
        assert!(!store.is_loading());

        let newer = store.add("newer");
        store.flush().await.unwrap();
        assert_eq!(stored(&memory), vec![newer, older]);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_and_recovers() {
        let flaky = FlakyStore::default();
        let store = store_over(&flaky, HistoryConfig::default());
        store.initialize().await;

        flaky.fail_writes.store(true, Ordering::SeqCst);
        let record = store.add("survives");
        assert_eq!(store.history(), vec![record.clone()]);

        let err = store.flush().await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
        let status = store.persist_status();
        assert!(status.last_error.is_some());
        assert!(status.saved_revision < status.attempted_revision);

        flaky.fail_writes.store(false, Ordering::SeqCst);
        let second = store.add("next");
        store.flush().await.unwrap();
        assert_eq!(store.persist_status().last_error, None);

        let persisted = snapshot::decode(&flaky.inner.value(KEY).unwrap()).unwrap();
        assert_eq!(persisted, vec![second, record]);
    }

    #[tokio::test]
    async fn test_rapid_mutations_converge() {
        let memory = MemoryStore::default();
        let store = ready_store(&memory).await;

        for i in 0..200 {
            let record = store.add(format!("payload {i}"));
            if i % 3 == 0 {
                store.remove(&record.id);
            }
        }
        store.flush().await.unwrap();

        assert_eq!(stored(&memory), store.history());
        let status = store.persist_status();
        assert_eq!(status.saved_revision, status.attempted_revision);
    }

    #[tokio::test]
    async fn test_max_entries_drops_oldest() {
        let memory = MemoryStore::default();
        let config = HistoryConfig {
            max_entries: Some(3),
            ..HistoryConfig::default()
        };
        let store = store_over(&memory, config);
        store.initialize().await;

        let ids: Vec<String> = (0..5).map(|i| store.add(format!("{i}")).id).collect();
        let kept: Vec<String> = store.history().into_iter().map(|r| r.id).collect();
        assert_eq!(kept, vec![ids[4].clone(), ids[3].clone(), ids[2].clone()]);
    }

    #[tokio::test]
    async fn test_zero_limit_means_unbounded() {
        let memory = MemoryStore::default();
        let config = HistoryConfig {
            max_entries: Some(0),
            ..HistoryConfig::default()
        };
        let store = store_over(&memory, config);
        store.initialize().await;
        store.add("a");
        store.add("b");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let memory = MemoryStore::default();
        let store = ready_store(&memory).await;
        let mut changes = store.subscribe();
        let _ = changes.borrow_and_update();

        store.add("ping");
        assert!(changes.has_changed().unwrap());
        let first = *changes.borrow_and_update();

        store.clear();
        assert!(*changes.borrow_and_update() > first);
    }

    #[tokio::test]
    async fn test_wait_until_ready_after_initialize() {
        let memory = MemoryStore::default();
        let store = store_over(&memory, HistoryConfig::default());
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.wait_until_ready().await })
        };
        store.initialize().await;
        waiter.await.unwrap();
        assert!(!store.is_loading());
    }
}
