//! Persistent task ledger backed by fjall (LSM-tree based storage)
//!
//! Tasks and their per-item results live in separate partitions. Result
//! keys embed the task id and a zero-padded index so a prefix scan yields
//! a task's results in playlist order.

mod error;
mod keys;
mod models;
#[allow(clippy::module_inception)]
mod store;

pub use error::{Result, StoreError};
pub use models::{AudioFormat, QualityTier, Task, TaskResult, VideoFormat};
pub use store::TaskStore;
