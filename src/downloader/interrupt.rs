//! Task interruption
//!
//! Cancelling a running download has to stop three things: the scheduler
//! from re-picking the task, any transcoder the downloader forked, and
//! the downloader process itself. The terminal notification is emitted
//! exactly once, here, after the run has fully unwound.

use super::{EngineContext, Result};
use crate::notify::PushEvent;
use std::sync::atomic::Ordering;
use sysinfo::System;
use tracing::{info, warn};
use uuid::Uuid;

/// Process names the downloader forks for post-processing. These do not
/// die with their parent, so they are hunted down by name.
const TRANSCODER_NAMES: &[&str] = &["ffmpeg", "avconv"];

pub async fn interrupt_task(ctx: &EngineContext, task_id: Uuid) -> Result<()> {
    let task = ctx.store.get_task(task_id)?;
    let already_interrupted = task.interrupted;

    // Flag first so the schedulers stop considering the task even if the
    // kill below races with a normal exit.
    ctx.store.update_task(task_id, |t| t.interrupted = true)?;

    if let Some(handle) = ctx.runs.get(task_id) {
        handle.interrupted.store(true, Ordering::SeqCst);
        kill_transcoders().await;
        handle.request_kill().await;
        handle.wait_done().await;
    }

    // The run may have completed or failed before the kill landed, and a
    // repeated interrupt already notified; either way the terminal event
    // went out once.
    let settled = ctx.store.get_task(task_id)?;
    if settled.downloaded || settled.downloader_errored || already_interrupted {
        info!(task_id = %task_id, "Task already settled, no further notification");
        return Ok(());
    }

    info!(task_id = %task_id, "Task interrupted");
    ctx.metrics.incr_interrupted();
    ctx.notify(&task.owner, PushEvent::TaskInterrupted { task_id })
        .await;

    Ok(())
}

/// Kill stray transcoder processes by name
async fn kill_transcoders() {
    let result = tokio::task::spawn_blocking(|| {
        let system = System::new_all();
        let mut killed = 0u32;
        for process in system.processes().values() {
            let Some(name) = process.name().to_str() else {
                continue;
            };
            if TRANSCODER_NAMES.contains(&name) && process.kill() {
                killed += 1;
            }
        }
        killed
    })
    .await;

    match result {
        Ok(killed) if killed > 0 => info!(killed, "Killed stray transcoder processes"),
        Ok(_) => {}
        Err(err) => warn!(error = %err, "Transcoder sweep failed"),
    }
}
