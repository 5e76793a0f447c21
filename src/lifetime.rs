//! Page lifetime and cancellable timers.
//!
//! An orchestrator lives exactly as long as the page that mounted it. When
//! the page is torn down, every pending remote call, retry wait and delayed
//! redirect belonging to it must stop without touching state again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Teardown signal shared by everything one page mount owns.
#[derive(Debug, Clone)]
pub struct PageLifetime {
    torn_down: Arc<watch::Sender<bool>>,
}

impl Default for PageLifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl PageLifetime {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            torn_down: Arc::new(tx),
        }
    }

    /// Mark the page as gone. Idempotent.
    pub fn teardown(&self) {
        if !self.torn_down.send_replace(true) {
            tracing::debug!("Page torn down");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        *self.torn_down.borrow()
    }

    /// Resolves once the page is torn down.
    pub async fn torn_down(&self) {
        let mut rx = self.torn_down.subscribe();
        // The sender lives in `self`, so this cannot fail with a closed channel.
        let _ = rx.wait_for(|gone| *gone).await;
    }

    /// Run `fut` unless the page goes away first.
    ///
    /// Returns `None` (and drops `fut`) if teardown wins the race.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_torn_down() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.torn_down() => None,
            out = fut => Some(out),
        }
    }

    /// Sleep for `delay`. Returns `false` if the page was torn down first.
    pub async fn sleep(&self, delay: Duration) -> bool {
        self.guard(tokio::time::sleep(delay)).await.is_some()
    }
}

/// One-shot delayed action bound to a page lifetime.
///
/// The action runs at most once, never after teardown, and never after
/// `cancel()`. Dropping the timer cancels it.
#[derive(Debug)]
pub struct Timer {
    handle: JoinHandle<()>,
}

impl Timer {
    /// Run `action` after `delay` unless cancelled or torn down first.
    pub fn schedule<F>(lifetime: &PageLifetime, delay: Duration, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let lifetime = lifetime.clone();
        let handle = tokio::spawn(async move {
            if lifetime.sleep(delay).await && !lifetime.is_torn_down() {
                action();
            }
        });
        Self { handle }
    }

    /// Stop the timer. No effect if it already fired.
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            self.handle.abort();
        }
    }

    /// Whether the timer fired, was cancelled or was torn down.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until the timer has fired or been cancelled.
    pub async fn settled(&mut self) {
        // A cancelled timer reports a JoinError; both mean "settled".
        let _ = (&mut self.handle).await;
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
