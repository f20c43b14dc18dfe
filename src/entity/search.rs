//! Debounced text search input.
//!
//! Keystrokes are pushed into a channel; a worker task waits until the input
//! has been quiet for the configured delay and then hands the last value to
//! the settle callback. Deduplication against the active search happens in
//! the callback, where the current page link is known.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(150);

pub struct SearchDebouncer {
    tx: UnboundedSender<String>,
    cancel: CancellationToken,
    worker_handle: JoinHandle<()>,
}

impl SearchDebouncer {
    /// Spawns the worker. `on_settled` returns `false` once its target is
    /// gone, which stops the worker.
    pub fn spawn<F, Fut>(delay: Duration, on_settled: F) -> Self
    where
        F: Fn(String) -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let (tx, mut rx) = unbounded_channel::<String>();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let worker_handle = tokio::spawn(async move {
            loop {
                let mut pending = tokio::select! {
                    _ = token.cancelled() => break,
                    value = rx.recv() => match value {
                        Some(value) => value,
                        None => break,
                    },
                };

                // Restart the quiet period on every new value.
                let mut closed = false;
                loop {
                    tokio::select! {
                        _ = token.cancelled() => return,
                        _ = tokio::time::sleep(delay) => break,
                        value = rx.recv() => match value {
                            Some(value) => pending = value,
                            None => {
                                closed = true;
                                break;
                            }
                        },
                    }
                }

                debug!(value = %pending, "Search input settled");
                if !on_settled(pending).await {
                    debug!("Search target dropped, stopping debouncer");
                    break;
                }
                if closed {
                    break;
                }
            }
        });

        Self {
            tx,
            cancel,
            worker_handle,
        }
    }

    pub fn push(&self, value: impl Into<String>) {
        if self.tx.send(value.into()).is_err() {
            warn!("Search debouncer is no longer running");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.worker_handle.is_finished()
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
