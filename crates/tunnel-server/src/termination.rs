use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Close-once, non-blockingly-observable signal shared by every acceptor in
/// one supervisor iteration (spec §4.4 "Termination", §5 "Cancellation").
#[derive(Default)]
pub struct Termination {
    fired: AtomicBool,
    notify: Notify,
}

impl Termination {
    pub fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Idempotent: only the first call has any effect.
    pub fn signal(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_signaled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves once `signal` has been called; resolves immediately if it
    /// already has been.
    pub async fn wait(&self) {
        if self.is_signaled() {
            return;
        }
        let notified = self.notify.notified();
        if self.is_signaled() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_returns_immediately_after_signal() {
        let term = Arc::new(Termination::new());
        term.signal();
        term.wait().await;
        assert!(term.is_signaled());
    }

    #[tokio::test]
    async fn wakes_waiters_exactly_once_per_process() {
        let term = Arc::new(Termination::new());
        let waiter = {
            let term = term.clone();
            tokio::spawn(async move {
                term.wait().await;
            })
        };
        term.signal();
        term.signal(); // idempotent, must not panic or double-notify badly
        waiter.await.unwrap();
    }
}
