//! Target-scoped toast notifications.
//!
//! Every screen listens on the same broadcast channel and only displays the
//! toasts addressed to its own target.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Success,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastNotification {
    pub message: String,
    pub kind: NotificationKind,
    pub target: String,
    pub duration_ms: u64,
}

impl ToastNotification {
    pub fn success(message: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
            target: target.into(),
            duration_ms: DEFAULT_TOAST_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastMessage {
    Show(ToastNotification),
    /// Hides whatever toast is visible on the target.
    Hide { target: String },
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<ToastMessage>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ToastMessage> {
        self.tx.subscribe()
    }

    pub fn show(&self, notification: ToastNotification) {
        debug!(target_view = %notification.target, message = %notification.message, "Showing toast");
        // No listener is not an error, the toast is simply not seen.
        let _ = self.tx.send(ToastMessage::Show(notification));
    }

    pub fn hide(&self, target: impl Into<String>) {
        let _ = self.tx.send(ToastMessage::Hide {
            target: target.into(),
        });
    }
}
