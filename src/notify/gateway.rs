use super::events::PushEvent;
use crate::retry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Seam between the download engine and whatever carries events to owners
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn notify(&self, owner: &str, event: PushEvent);
}

/// Per-owner subscription capacity. A lagging consumer triggers the retry
/// path instead of blocking the engine.
const CHANNEL_CAPACITY: usize = 64;

type SenderMap = Arc<Mutex<HashMap<String, mpsc::Sender<PushEvent>>>>;

/// Routes push events to per-owner channels
///
/// Delivery never blocks the caller: a full or missing channel spawns a
/// background task that retries with backoff, re-resolving the owner's
/// current channel on every attempt. Events whose retries exhaust are
/// dropped with a warning; owners reconcile via the query API.
#[derive(Clone)]
pub struct NotificationGateway {
    senders: SenderMap,
    retry_attempts: u32,
}

impl NotificationGateway {
    pub fn new(retry_attempts: u32) -> Self {
        Self {
            senders: Arc::new(Mutex::new(HashMap::new())),
            retry_attempts,
        }
    }

    /// Register an owner's event stream, replacing any previous one.
    /// Events queued on the old channel are dropped with it.
    pub fn subscribe(&self, owner: &str) -> mpsc::Receiver<PushEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        senders.insert(owner.to_string(), tx);
        rx
    }

    pub fn unsubscribe(&self, owner: &str) {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        senders.remove(owner);
    }

    fn try_deliver(senders: &SenderMap, owner: &str, event: &PushEvent) -> Result<(), String> {
        let sender = {
            let map = senders.lock().unwrap_or_else(|e| e.into_inner());
            map.get(owner).cloned()
        };
        match sender {
            Some(tx) => tx
                .try_send(event.clone())
                .map_err(|e| format!("channel unavailable: {e}")),
            None => Err("owner has no active subscription".to_string()),
        }
    }
}

#[async_trait]
impl EventSink for NotificationGateway {
    async fn notify(&self, owner: &str, event: PushEvent) {
        if Self::try_deliver(&self.senders, owner, &event).is_ok() {
            debug!(owner, event = event.name(), "Delivered push event");
            return;
        }

        // Retry off the hot path. The sender map is re-read each attempt so
        // an owner reconnecting mid-retry still gets the event.
        let senders = Arc::clone(&self.senders);
        let owner = owner.to_string();
        let attempts = self.retry_attempts;
        tokio::spawn(async move {
            let outcome = retry::with_backoff(attempts, "push_notification", || {
                let result = Self::try_deliver(&senders, &owner, &event);
                async move { result }
            })
            .await;
            if let Err(err) = outcome {
                warn!(
                    owner,
                    event = event.name(),
                    error = %err,
                    "Dropping push event after exhausting retries"
                );
            }
        });
    }
}
