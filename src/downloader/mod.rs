//! Download engine
//!
//! Two serial scheduler loops drive the pipeline: the metadata loop runs
//! `--dump-json` passes to discover what a URL contains, the download
//! loop runs the actual fetches. Each spawned run registers itself so
//! the interrupt coordinator can cancel it from the API side.

pub mod args;
pub mod interrupt;
pub mod metadata;
pub mod parser;
pub mod process;
pub mod scheduler;
pub mod supervisor;

use crate::config::DownloaderConfig;
use crate::notify::{EventSink, PushEvent};
use crate::observability::Metrics;
use crate::store::{StoreError, TaskStore};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to spawn downloader: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Downloader exited abnormally: {0}")]
    Wait(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which pipeline stage a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Metadata,
    Download,
}

/// Shared engine state threaded through schedulers, supervisors and the
/// interrupt coordinator
#[derive(Clone)]
pub struct EngineContext {
    pub store: TaskStore,
    pub sink: Arc<dyn EventSink>,
    pub config: DownloaderConfig,
    pub runs: ActiveRuns,
    pub metrics: Arc<Metrics>,
}

impl EngineContext {
    pub fn new(store: TaskStore, sink: Arc<dyn EventSink>, config: DownloaderConfig) -> Self {
        Self {
            store,
            sink,
            config,
            runs: ActiveRuns::default(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub async fn notify(&self, owner: &str, event: PushEvent) {
        self.sink.notify(owner, event).await;
    }
}

/// Handle to a live downloader run, held by the interrupt coordinator
#[derive(Clone)]
pub struct RunHandle {
    pub task_id: Uuid,
    pub kind: RunKind,
    /// Set before killing so the exit path knows success must be suppressed
    pub interrupted: Arc<AtomicBool>,
    kill_tx: mpsc::Sender<()>,
    done_rx: watch::Receiver<bool>,
}

impl RunHandle {
    /// Ask the run to kill its child process. Best effort; the run may
    /// already be exiting.
    pub async fn request_kill(&self) {
        let _ = self.kill_tx.send(()).await;
    }

    /// Wait until the run's supervisor has fully unwound
    pub async fn wait_done(&self) {
        let mut rx = self.done_rx.clone();
        // wait_for also returns immediately if the value is already true.
        let _ = rx.wait_for(|done| *done).await;
    }
}

/// Registry of in-flight runs, keyed by task id
#[derive(Clone, Default)]
pub struct ActiveRuns {
    inner: Arc<Mutex<HashMap<Uuid, RunHandle>>>,
}

impl ActiveRuns {
    /// Register a run. Returns the RAII guard the supervisor holds for
    /// the run's lifetime and the kill-request receiver it must poll.
    pub fn register(&self, task_id: Uuid, kind: RunKind) -> (RunGuard, mpsc::Receiver<()>) {
        let (kill_tx, kill_rx) = mpsc::channel(1);
        let (done_tx, done_rx) = watch::channel(false);
        let handle = RunHandle {
            task_id,
            kind,
            interrupted: Arc::new(AtomicBool::new(false)),
            kill_tx,
            done_rx,
        };
        let interrupted = Arc::clone(&handle.interrupted);
        {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.insert(task_id, handle);
        }
        let guard = RunGuard {
            runs: self.clone(),
            task_id,
            interrupted,
            done_tx,
        };
        (guard, kill_rx)
    }

    pub fn get(&self, task_id: Uuid) -> Option<RunHandle> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&task_id).cloned()
    }

    fn release(&self, task_id: Uuid) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&task_id);
    }
}

/// Held by a supervisor while its run is alive. Dropping it, on any exit
/// path, releases the registry slot and wakes everyone in `wait_done`.
pub struct RunGuard {
    runs: ActiveRuns,
    task_id: Uuid,
    interrupted: Arc<AtomicBool>,
    done_tx: watch::Sender<bool>,
}

impl RunGuard {
    pub fn interrupted(&self) -> &Arc<AtomicBool> {
        &self.interrupted
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.runs.release(self.task_id);
        let _ = self.done_tx.send(true);
    }
}
