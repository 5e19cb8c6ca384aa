//! Bounded retry with linear backoff
//!
//! Used for notification delivery and download-directory cleanup, both of
//! which race against slow consumers or lingering file handles.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `op` up to `attempts` times, sleeping `attempt + 1` seconds after
/// each failure. Returns the first success, or the last error once the
/// attempts are exhausted.
pub async fn with_backoff<T, E, F, Fut>(attempts: u32, label: &str, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(
                    %label,
                    attempt = attempt + 1,
                    attempts,
                    error = %err,
                    "Attempt failed, backing off"
                );
                last_err = Some(err);
                if attempt + 1 < attempts {
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt) + 1)).await;
                }
            }
        }
    }
    // attempts is validated non-zero by config; the loop body always sets
    // last_err before falling through.
    Err(last_err.unwrap())
}
