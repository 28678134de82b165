//! Request-scoped deadline and cancellation
//!
//! Every storage and identity-provider call takes a `&Context`. Handlers
//! derive one per request with the configured timeout, and background work
//! starts from [`Context::background`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped accepting work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Deadline plus cancellation signal, cloned down the call chain
#[derive(Debug, Clone)]
pub struct Context {
    cancelled: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Cancels every context derived from the one it was created with
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Context {
    /// Context that is never cancelled and has no deadline
    pub fn background() -> Self {
        let (_sender, cancelled) = watch::channel(false);
        Self {
            cancelled,
            deadline: None,
        }
    }

    /// Root context paired with a handle that cancels it
    pub fn cancellable() -> (Self, CancelHandle) {
        let (sender, cancelled) = watch::channel(false);
        (
            Self {
                cancelled,
                deadline: None,
            },
            CancelHandle { sender },
        )
    }

    /// Derive a child whose deadline is at most `timeout` from now.
    ///
    /// An earlier parent deadline wins; cancellation is shared with the parent.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };

        Self {
            cancelled: self.cancelled.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Reason this context is done, if it is
    pub fn err(&self) -> Option<Interrupted> {
        if *self.cancelled.borrow() {
            return Some(Interrupted::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupted::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Drive `future` until it completes or the context ends.
    ///
    /// The future is dropped on cancellation or deadline, which abandons any
    /// in-flight I/O it owns.
    pub async fn run<F, T>(&self, future: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        if let Some(reason) = self.err() {
            return Err(reason);
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            output = future => Ok(output),
            _ = self.wait_cancelled() => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
        }
    }

    async fn wait_cancelled(&self) {
        let mut cancelled = self.cancelled.clone();
        loop {
            if *cancelled.borrow_and_update() {
                return;
            }
            if cancelled.changed().await.is_err() {
                // Sender dropped without cancelling: this context can no longer be cancelled.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
