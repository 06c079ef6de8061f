//! Process-wide cancellation flag (part of component C8).
//!
//! A single [`CancelToken`] is created per run and cloned into every
//! place that needs to observe it — the coordinator's between-entry
//! check, and the process manager's in-flight child wait. The first
//! `SIGINT`/`SIGTERM` the CLI binary observes sets it; the engine
//! itself never installs signal handlers (that is the CLI's job,
//! since only the outermost process owns the terminal).

use std::sync::Arc;
use tokio::sync::Notify;

/// A cheaply-cloneable, process-wide "please stop" signal.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<std::sync::atomic::AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Raise the flag. Idempotent: a second call is a no-op, so a
    /// repeated signal during shutdown has no further effect.
    pub fn cancel(&self) {
        use std::sync::atomic::Ordering;
        if !self.flag.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Resolves once [`Self::cancel`] has been called. If it already
    /// has been, resolves immediately.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_uncancelled() {
        let t = CancelToken::new();
        assert!(!t.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_is_observable_and_idempotent() {
        let t = CancelToken::new();
        t.cancel();
        t.cancel();
        assert!(t.is_cancelled());
        t.cancelled().await;
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let t = CancelToken::new();
        let t2 = t.clone();
        t.cancel();
        assert!(t2.is_cancelled());
    }
}
