use async_trait::async_trait;
use tracing::info;

/// Modal dialogs resolved asynchronously so callers never block other work.
#[async_trait]
pub trait DialogService: Send + Sync {
    /// `true` when the user confirmed.
    async fn confirm(
        &self,
        title: &str,
        message: &str,
        cancel_label: &str,
        ok_label: &str,
        fullscreen: bool,
    ) -> bool;

    async fn alert(&self, title: &str, message: &str, ok_label: &str);

    /// Shows read-only content such as a message payload.
    async fn show_content(&self, title: &str, content: &str);
}

/// Confirms everything and logs what would have been shown.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirmDialogs;

#[async_trait]
impl DialogService for AutoConfirmDialogs {
    async fn confirm(&self, title: &str, message: &str, _: &str, ok_label: &str, _: bool) -> bool {
        info!(title, message, ok_label, "Auto-confirming dialog");
        true
    }

    async fn alert(&self, title: &str, message: &str, _: &str) {
        info!(title, message, "Alert");
    }

    async fn show_content(&self, title: &str, content: &str) {
        info!(title, "Dialog content:\n{}", content);
    }
}
