//! Main download pass
//!
//! Supervises one downloader process for one task: feeds it the assembled
//! arguments, follows its console output to track playlist position and
//! progress, finalizes each item as the process moves past it, and
//! settles the task's terminal state when the process exits.

use super::parser::{self, ParsedLine, ProgressGate};
use super::process::{self, OutputLine};
use super::{args, DownloadError, EngineContext, Result, RunKind};
use crate::files;
use crate::naming;
use crate::notify::PushEvent;
use crate::store::{Task, TaskResult};
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, warn};

/// Playlist cursor for a running download
struct RunState {
    /// 1-based position reported by the downloader
    current_index: u32,
    /// Source item id of the current position, once known
    current_item: Option<String>,
    gate: ProgressGate,
}

pub async fn run(ctx: &EngineContext, task: &Task) -> Result<()> {
    let (guard, mut kill_rx) = ctx.runs.register(task.id, RunKind::Download);

    let dir = naming::task_dir(&ctx.config.download_root, &task.owner, task.id);
    tokio::fs::create_dir_all(&dir).await?;

    let template = naming::output_template(
        &ctx.config.download_root,
        &task.owner,
        task.id,
        ctx.config.max_title_length,
    );
    let cmd_args = args::download_args(task, &ctx.config.ffmpeg_path, &template);

    let mut proc = match process::spawn(&ctx.config.binary_path, &cmd_args) {
        Ok(proc) => proc,
        Err(err) => {
            error!(task_id = %task.id, error = %err, "Failed to spawn download pass");
            fail_task(ctx, task).await?;
            return Ok(());
        }
    };

    let mut state = RunState {
        current_index: 1,
        current_item: None,
        gate: ProgressGate::new(ctx.config.progress_threshold),
    };
    let mut kill_requested = false;

    loop {
        tokio::select! {
            line = proc.lines.recv() => match line {
                Some(OutputLine::Stdout(line)) => {
                    handle_stdout(ctx, task, &dir, &mut state, &line).await?;
                }
                Some(OutputLine::Stderr(line)) => {
                    // Item errors were already recorded by the metadata
                    // pass; during the main pass stderr is noise.
                    if let Some(message) = parser::parse_stderr(&line) {
                        warn!(task_id = %task.id, %message, "Downloader reported an error");
                    } else {
                        debug!(task_id = %task.id, %line, "Downloader stderr");
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

    let status = match proc.child.wait().await {
        Ok(status) => status,
        Err(err) => {
            error!(task_id = %task.id, error = %err, "Download pass did not exit cleanly");
            fail_task(ctx, task).await?;
            return Err(DownloadError::Wait(err));
        }
    };

    if guard.interrupted().load(Ordering::SeqCst) {
        // The interrupt coordinator owns the terminal notification.
        info!(task_id = %task.id, "Download pass interrupted");
        return Ok(());
    }

    debug!(task_id = %task.id, ?status, "Download pass exited");

    // The last item never gets a playlist-advance line; settle it here.
    finalize_item(ctx, task, &dir, &state).await?;

    ctx.store.update_task(task.id, |t| t.downloaded = true)?;
    ctx.store.persist()?;
    ctx.metrics.incr_finished();
    info!(task_id = %task.id, "Task finished");

    ctx.notify(&task.owner, PushEvent::TaskFinished { task_id: task.id })
        .await;

    Ok(())
}

async fn handle_stdout(
    ctx: &EngineContext,
    task: &Task,
    dir: &Path,
    state: &mut RunState,
    line: &str,
) -> Result<()> {
    match parser::parse_stdout(line) {
        Some(ParsedLine::PlaylistItem { index }) => {
            if index > 1 {
                // Moving past an item means its file is complete.
                finalize_item(ctx, task, dir, state).await?;
            }
            state.current_index = index;
            state.current_item = None;
            state.gate.reset();
        }
        Some(ParsedLine::ItemIdentified { item_id }) => {
            state.current_item = Some(item_id.clone());
            let result = match resolve_result(ctx, task, state.current_index, Some(&item_id))? {
                Some(result) => {
                    // Late-bind the id only when the metadata pass never
                    // learned one; an existing id is authoritative.
                    ctx.store.update_result(result.id, |r| {
                        if r.item_id.is_none() {
                            r.item_id = Some(item_id.clone());
                        }
                    })?
                }
                None => {
                    // Metadata pass saw fewer items than the download
                    // pass produces; record the straggler.
                    let mut result = TaskResult::new(task.id, state.current_index);
                    result.item_id = Some(item_id.clone());
                    ctx.store.insert_result(&result)?;
                    result
                }
            };
            // Errored items still scroll past in the output; their
            // failure was already reported.
            if !result.has_error {
                ctx.notify(
                    &task.owner,
                    PushEvent::DownloadStarted {
                        task_id: task.id,
                        result_id: result.id,
                    },
                )
                .await;
            }
        }
        Some(ParsedLine::Progress { percent }) => {
            if state.gate.accept(percent) {
                let result_id =
                    resolve_result(ctx, task, state.current_index, state.current_item.as_deref())?
                        .map(|r| r.id);
                ctx.notify(
                    &task.owner,
                    PushEvent::DownloadProgress {
                        task_id: task.id,
                        result_id,
                        percent,
                    },
                )
                .await;
            }
        }
        Some(ParsedLine::Transcoding) => {
            let result_id =
                resolve_result(ctx, task, state.current_index, state.current_item.as_deref())?
                    .map(|r| r.id);
            ctx.notify(
                &task.owner,
                PushEvent::DownloadConverting {
                    task_id: task.id,
                    result_id,
                },
            )
            .await;
        }
        None => {
            debug!(task_id = %task.id, %line, "Downloader stdout");
        }
    }
    Ok(())
}

/// Result record for a playlist position, preferring the source item id
/// over the positional index. Metadata order and download order can
/// disagree, so the id wins whenever it is known.
fn resolve_result(
    ctx: &EngineContext,
    task: &Task,
    index: u32,
    item_id: Option<&str>,
) -> Result<Option<TaskResult>> {
    if let Some(item_id) = item_id {
        if let Some(result) = ctx.store.find_result_by_item_id(task.id, item_id)? {
            return Ok(Some(result));
        }
    }
    Ok(ctx.store.find_result_by_index(task.id, index)?)
}

/// Mark the current item downloaded once its file is on disk.
///
/// Idempotent: already-finalized items are skipped, and nothing changes
/// unless the file is actually found. The path and downloaded flag are
/// set in the same write.
async fn finalize_item(
    ctx: &EngineContext,
    task: &Task,
    dir: &Path,
    state: &RunState,
) -> Result<()> {
    let Some(result) =
        resolve_result(ctx, task, state.current_index, state.current_item.as_deref())?
    else {
        debug!(
            task_id = %task.id,
            index = state.current_index,
            "No result record for finished item"
        );
        return Ok(());
    };

    if result.was_downloaded && result.path_to_file.is_some() {
        return Ok(());
    }
    if result.has_error {
        return Ok(());
    }

    let Some(item_id) = state
        .current_item
        .as_deref()
        .or(result.item_id.as_deref())
    else {
        debug!(task_id = %task.id, index = state.current_index, "Item id never reported, cannot correlate file");
        return Ok(());
    };

    let Some(path) = files::find_item_file(dir, item_id)? else {
        warn!(
            task_id = %task.id,
            item_id,
            "No file found for finished item"
        );
        return Ok(());
    };

    let updated = ctx.store.update_result(result.id, |r| {
        r.path_to_file = Some(path.display().to_string());
        r.was_downloaded = true;
    })?;

    ctx.notify(
        &task.owner,
        PushEvent::ResultFinished {
            task_id: task.id,
            result_id: updated.id,
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
