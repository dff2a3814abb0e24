//! Server-to-client notifications: the sink seam, token routing, and the
//! per-call progress view handed to tools.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mcp::{
    LoggingLevel, LoggingMessageNotificationParams, Meta, ProgressNotificationParams,
    ProgressToken, ServerNotification,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Push channel from the tool host to the caller.
///
/// `emit` must not block and must not fail the caller; delivery is
/// at-most-once.
pub trait NotificationSink: Send + Sync {
    fn emit(&self, notification: ServerNotification);
}

struct Subscriber {
    id: u64,
    sender: mpsc::UnboundedSender<ServerNotification>,
}

/// Routes notifications to the Turn that owns their progress token.
///
/// Cheap to clone; all clones share the same subscriber table.
#[derive(Clone, Default)]
pub struct NotificationChannel {
    subscribers: Arc<RwLock<HashMap<ProgressToken, Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every notification correlated with `token` until the
    /// subscription is dropped.
    pub fn subscribe(&self, token: ProgressToken) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .subscribers
            .write()
            .insert(token.clone(), Subscriber { id, sender });
        if previous.is_some() {
            warn!(%token, "progress token reused, replacing earlier subscriber");
        }
        Subscription {
            id,
            token,
            receiver,
            channel: self.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn unsubscribe(&self, token: &ProgressToken, id: u64) {
        let mut subscribers = self.subscribers.write();
        if subscribers.get(token).is_some_and(|s| s.id == id) {
            subscribers.remove(token);
        }
    }
}

impl NotificationSink for NotificationChannel {
    fn emit(&self, notification: ServerNotification) {
        let method = notification.method();
        let Some(token) = notification.progress_token().cloned() else {
            debug!(method, "dropping notification without progress token");
            return;
        };

        let sender = self
            .subscribers
            .read()
            .get(&token)
            .map(|s| s.sender.clone());

        match sender {
            Some(sender) => {
                if sender.send(notification).is_err() {
                    warn!(%token, method, "notification undeliverable, receiver closed");
                }
            }
            None => debug!(%token, method, "no subscriber for notification"),
        }
    }
}

/// Notifications for one progress token.
pub struct Subscription {
    id: u64,
    token: ProgressToken,
    receiver: mpsc::UnboundedReceiver<ServerNotification>,
    channel: NotificationChannel,
}

impl Subscription {
    pub fn token(&self) -> &ProgressToken {
        &self.token
    }

    /// Wait for the next notification.
    pub async fn recv(&mut self) -> Option<ServerNotification> {
        self.receiver.recv().await
    }

    /// Take everything already delivered without waiting.
    pub fn drain(&mut self) -> Vec<ServerNotification> {
        let mut drained = Vec::new();
        while let Ok(notification) = self.receiver.try_recv() {
            drained.push(notification);
        }
        drained
    }

    /// Stop routing and return whatever was still queued.
    pub fn close(mut self) -> Vec<ServerNotification> {
        self.channel.unsubscribe(&self.token, self.id);
        self.drain()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.channel.unsubscribe(&self.token, self.id);
    }
}

/// Highest progress reported per token.
#[derive(Debug, Default)]
pub struct ProgressLedger {
    marks: Mutex<HashMap<ProgressToken, f64>>,
}

impl ProgressLedger {
    /// Clamp `fraction` into [0, 1] and never below the token's previous
    /// value; record and return the result.
    pub fn advance(&self, token: &ProgressToken, fraction: f64) -> f64 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut marks = self.marks.lock();
        let mark = marks.entry(token.clone()).or_insert(0.0);
        *mark = mark.max(fraction);
        *mark
    }

    pub fn release(&self, token: &ProgressToken) {
        self.marks.lock().remove(token);
    }

    pub fn tracked(&self) -> usize {
        self.marks.lock().len()
    }
}

/// Per-call notification helper bound to one token.
pub struct Notifier<'a> {
    sink: &'a dyn NotificationSink,
    ledger: &'a ProgressLedger,
    token: &'a ProgressToken,
    logger: &'a str,
}

impl<'a> Notifier<'a> {
    pub fn new(
        sink: &'a dyn NotificationSink,
        ledger: &'a ProgressLedger,
        token: &'a ProgressToken,
        logger: &'a str,
    ) -> Self {
        Self {
            sink,
            ledger,
            token,
            logger,
        }
    }

    pub fn log(&self, level: LoggingLevel, data: impl Into<String>) {
        self.sink
            .emit(ServerNotification::LoggingMessage(LoggingMessageNotificationParams {
                level,
                logger: Some(self.logger.to_string()),
                data: Value::String(data.into()),
                meta: Some(Meta::with_progress_token(self.token.clone())),
            }));
    }

    /// Report progress; returns the value actually sent.
    pub fn progress(&self, fraction: f64, message: impl Into<String>) -> f64 {
        let progress = self.ledger.advance(self.token, fraction);
        self.sink
            .emit(ServerNotification::Progress(ProgressNotificationParams {
                progress_token: self.token.clone(),
                progress,
                total: Some(1.0),
                message: Some(message.into()),
            }));
        progress
    }
}
