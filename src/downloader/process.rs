//! Spawning the downloader binary and pumping its output
//!
//! Stdout and stderr are read line-by-line on separate tasks and merged
//! into a single channel so the supervisor consumes them in arrival
//! order without blocking either pipe.

use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::debug;

const LINE_CHANNEL_CAPACITY: usize = 256;

/// One line of downloader output, tagged by stream
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// A spawned downloader process with its merged output stream
pub struct RunningProcess {
    pub child: Child,
    pub lines: mpsc::Receiver<OutputLine>,
}

/// Spawn the downloader binary with piped output
///
/// The child is killed if the handle is dropped, so an engine shutdown
/// never leaves orphaned downloads behind.
pub fn spawn(binary: &Path, args: &[String]) -> std::io::Result<RunningProcess> {
    debug!(binary = %binary.display(), ?args, "Spawning downloader");

    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);

    if let Some(stdout) = child.stdout.take() {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(OutputLine::Stdout(line)).await.is_err() {
                    break;
                }
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(OutputLine::Stderr(line)).await.is_err() {
                    break;
                }
            }
        });
    }

    Ok(RunningProcess { child, lines: rx })
}
