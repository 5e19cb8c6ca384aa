//! Scheduler loops
//!
//! One loop per pipeline stage, each running at most one task at a time.
//! Eligible work is picked straight off the store by `queued_at`, oldest
//! first, so a restart resumes exactly where the previous process left
//! off with no separate queue to rebuild.

use super::{metadata, supervisor, EngineContext};
use crate::store::Task;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Spawn both scheduler loops. They stop when `shutdown` flips to true.
pub fn spawn(
    ctx: EngineContext,
    shutdown: watch::Receiver<bool>,
) -> (JoinHandle<()>, JoinHandle<()>) {
    let metadata_handle = tokio::spawn(metadata_loop(ctx.clone(), shutdown.clone()));
    let download_handle = tokio::spawn(download_loop(ctx, shutdown));
    (metadata_handle, download_handle)
}

pub async fn metadata_loop(ctx: EngineContext, mut shutdown: watch::Receiver<bool>) {
    info!("Metadata scheduler started");
    let idle = Duration::from_secs(ctx.config.metadata_poll_seconds);
    loop {
        match ctx.store.next_eligible(Task::needs_metadata) {
            Ok(Some(task)) => {
                if let Err(err) = metadata::run(&ctx, &task).await {
                    error!(task_id = %task.id, error = %err, "Metadata pass failed");
                }
            }
            Ok(None) => {
                if wait_or_shutdown(&mut shutdown, idle).await {
                    break;
                }
            }
            Err(err) => {
                error!(error = %err, "Failed to poll for metadata work");
                if wait_or_shutdown(&mut shutdown, idle).await {
                    break;
                }
            }
        }
        if *shutdown.borrow() {
            break;
        }
    }
    info!("Metadata scheduler stopped");
}

pub async fn download_loop(ctx: EngineContext, mut shutdown: watch::Receiver<bool>) {
    info!("Download scheduler started");
    let idle = Duration::from_secs(ctx.config.download_poll_seconds);
    loop {
        match ctx.store.next_eligible(Task::needs_download) {
            Ok(Some(task)) => {
                if let Err(err) = supervisor::run(&ctx, &task).await {
                    error!(task_id = %task.id, error = %err, "Download pass failed");
                }
            }
            Ok(None) => {
                if wait_or_shutdown(&mut shutdown, idle).await {
                    break;
                }
            }
            Err(err) => {
                error!(error = %err, "Failed to poll for download work");
                if wait_or_shutdown(&mut shutdown, idle).await {
                    break;
                }
            }
        }
        if *shutdown.borrow() {
            break;
        }
    }
    info!("Download scheduler stopped");
}

/// Sleep for the idle interval, waking early on shutdown. Returns true
/// when the loop should exit.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, idle: Duration) -> bool {
    tokio::select! {
        stopped = async { shutdown.wait_for(|stop| *stop).await.is_ok() } => stopped,
        _ = tokio::time::sleep(idle) => false,
    }
}
