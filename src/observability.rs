//! Service counters, reported through the health endpoint

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    pub tasks_queued: AtomicU64,
    pub tasks_finished: AtomicU64,
    pub tasks_interrupted: AtomicU64,
    pub tasks_failed: AtomicU64,
    pub tasks_deleted: AtomicU64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub tasks_queued: u64,
    pub tasks_finished: u64,
    pub tasks_interrupted: u64,
    pub tasks_failed: u64,
    pub tasks_deleted: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_queued(&self) {
        self.tasks_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_finished(&self) {
        self.tasks_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_interrupted(&self) {
        self.tasks_interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_deleted(&self) {
        self.tasks_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_queued: self.tasks_queued.load(Ordering::Relaxed),
            tasks_finished: self.tasks_finished.load(Ordering::Relaxed),
            tasks_interrupted: self.tasks_interrupted.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_deleted: self.tasks_deleted.load(Ordering::Relaxed),
        }
    }
}
