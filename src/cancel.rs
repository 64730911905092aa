use std::sync::Arc;

use tokio::sync::watch;

/// Clonable cancellation signal for a single logical call.
///
/// Any clone can trigger cancellation; all clones observe it. A call has
/// exactly one active signal at a time: [`Client::send`](crate::Client::send)
/// decides whether it governs the request directly or the backoff waits
/// between retry attempts.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Fires the cancellation signal. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the token is cancelled. Resolves immediately if it
    /// already is; otherwise suspends until some clone cancels.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // All senders are held by token clones, so this branch is
                // unreachable while a waiter exists.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
