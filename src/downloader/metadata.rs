//! Metadata-gathering pass
//!
//! Runs the downloader with `--dump-json` to discover what a URL
//! expands to before anything is fetched. Every stdout line is one JSON
//! document describing an item; stderr `ERROR:` lines become errored
//! result records. Records are created in output order, so playlist
//! position survives into the result index.

use super::process::{self, OutputLine};
use super::{args, parser, DownloadError, EngineContext, Result, RunKind};
use crate::notify::PushEvent;
use crate::store::{Task, TaskResult};
use serde::Deserialize;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, warn};

/// Fields of interest in a `--dump-json` document
#[derive(Debug, Deserialize)]
struct ItemMetadata {
    id: Option<String>,
    title: Option<String>,
    webpage_url: Option<String>,
}

enum Seed {
    Item(ItemMetadata),
    Error(String),
}

pub async fn run(ctx: &EngineContext, task: &Task) -> Result<()> {
    let (guard, mut kill_rx) = ctx.runs.register(task.id, RunKind::Metadata);

    let cmd_args = args::metadata_args(&task.url);
    let mut proc = match process::spawn(&ctx.config.binary_path, &cmd_args) {
        Ok(proc) => proc,
        Err(err) => {
            error!(task_id = %task.id, error = %err, "Failed to spawn metadata pass");
            fail_task(ctx, task).await?;
            return Ok(());
        }
    };

    let mut seeds: Vec<Seed> = Vec::new();
    let mut kill_requested = false;

    loop {
        tokio::select! {
            line = proc.lines.recv() => match line {
                Some(OutputLine::Stdout(line)) => {
                    match serde_json::from_str::<ItemMetadata>(&line) {
                        Ok(item) => seeds.push(Seed::Item(item)),
                        Err(_) => debug!(task_id = %task.id, %line, "Ignoring non-JSON metadata line"),
                    }
                }
                Some(OutputLine::Stderr(line)) => {
                    if let Some(message) = parser::parse_stderr(&line) {
                        warn!(task_id = %task.id, %message, "Metadata pass reported an item error");
                        seeds.push(Seed::Error(message));
                    } else {
                        debug!(task_id = %task.id, %line, "Metadata pass stderr");
                    }
                }
                None => break,
            },
            _ = kill_rx.recv(), if !kill_requested => {
                kill_requested = true;
                let _ = proc.child.kill().await;
            }
        }
    }

    if let Err(err) = proc.child.wait().await {
        error!(task_id = %task.id, error = %err, "Metadata pass did not exit cleanly");
        fail_task(ctx, task).await?;
        return Err(DownloadError::Wait(err));
    }

    if guard.interrupted().load(Ordering::SeqCst) {
        // The interrupt coordinator owns the terminal notification.
        info!(task_id = %task.id, "Metadata pass interrupted");
        return Ok(());
    }

    let result_count = seeds.len();
    let is_playlist = result_count > 1;

    for (position, seed) in seeds.into_iter().enumerate() {
        let index = position as u32 + 1;
        let mut result = match seed {
            Seed::Item(item) => {
                let mut result = TaskResult::new(task.id, index);
                result.item_id = item.id;
                result.title = item.title;
                result.url = item.webpage_url;
                result
            }
            Seed::Error(message) => TaskResult::errored(task.id, index, message),
        };
        result.is_part_of_playlist = is_playlist;
        let errored = result.has_error;
        ctx.store.insert_result(&result)?;
        if errored {
            ctx.notify(
                &task.owner,
                PushEvent::ResultErrored {
                    task_id: task.id,
                    result_id: result.id,
                    message: result.error_message.clone().unwrap_or_default(),
                },
            )
            .await;
        }
    }

    ctx.store.update_task(task.id, |t| t.metadata_gathered = true)?;
    info!(task_id = %task.id, result_count, is_playlist, "Metadata gathered");

    ctx.notify(
        &task.owner,
        PushEvent::MetadataGathered {
            task_id: task.id,
            result_count,
            is_playlist,
        },
    )
    .await;

    Ok(())
}

async fn fail_task(ctx: &EngineContext, task: &Task) -> Result<()> {
    ctx.store
        .update_task(task.id, |t| t.downloader_errored = true)?;
    ctx.metrics.incr_failed();
    ctx.notify(&task.owner, PushEvent::TaskFailed { task_id: task.id })
        .await;
    Ok(())
}
