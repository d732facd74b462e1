use std::{
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use tokio::sync::oneshot;

use super::KeyValueStore;

type StorageTask = Box<dyn FnOnce(&mut dyn KeyValueStore) + Send + 'static>;

enum StorageCommand {
    Execute(StorageTask),
    Shutdown,
}

struct WorkerInner {
    sender: mpsc::Sender<StorageCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WorkerInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Shutdown queues behind pending writes, so those still land before the join.
        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StorageCommand::Shutdown) {
                error!("Failed to send shutdown to storage thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join storage thread: {join_err:?}");
            }
        }
    }
}

/// Owns one key-value backend on a dedicated thread. Tasks run one at a time
/// in the order they were handed over.
#[derive(Clone)]
pub struct StorageWorker {
    inner: Arc<WorkerInner>,
    backend: Arc<str>,
}

impl StorageWorker {
    /// Spawn the worker thread and open the backend on it. Returns once the
    /// backend is open, or with the error that prevented it.
    pub fn spawn<F>(backend: &str, open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn KeyValueStore>> + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel::<StorageCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let thread_backend = backend.to_string();

        let worker = thread::Builder::new()
            .name("qrscan-storage".into())
            .spawn(move || {
                let mut store = match open() {
                    Ok(store) => store,
                    Err(err) => {
                        let _ = ready_tx.send(Err(
                            err.context(format!("failed to open {thread_backend} storage"))
                        ));
                        return;
                    }
                };

                if ready_tx.send(Ok(())).is_err() {
                    error!("Storage initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StorageCommand::Execute(task) => task(store.as_mut()),
                        StorageCommand::Shutdown => break,
                    }
                }

                info!("Storage thread ({thread_backend}) shutting down");
            })
            .with_context(|| "failed to spawn storage worker thread")?;

        ready_rx
            .recv()
            .context("storage worker exited before signaling readiness")??;

        info!("Storage initialized ({backend})");

        Ok(Self {
            inner: Arc::new(WorkerInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            backend: Arc::from(backend),
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Run `task` on the storage thread and wait for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut dyn KeyValueStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.submit(move |store| {
            let result = task(store);
            if reply_tx.send(result).is_err() {
                error!("Storage caller dropped before receiving result");
            }
        })?;

        reply_rx
            .await
            .map_err(|_| anyhow!("storage thread terminated unexpectedly"))?
    }

    /// Queue `task` without waiting for it. Only fails if the thread is gone.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce(&mut dyn KeyValueStore) + Send + 'static,
    {
        self.inner
            .sender
            .send(StorageCommand::Execute(Box::new(task)))
            .map_err(|err| anyhow!("failed to send command to storage thread: {err}"))
    }
}
