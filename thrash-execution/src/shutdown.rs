//! Cooperative shutdown coordination
//!
//! One latching flag, set from signal handlers and polled at every
//! suspension point. Handlers only set the flag and return; all cleanup
//! happens cooperatively inside the task loops. Cross-process visibility
//! is provided by the orchestrator relaying the flag to each worker child
//! over its stdin IPC channel (see the orchestrator module).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

/// A latching shutdown flag.
///
/// Once [`set`] has been called, [`is_set`] never returns false again for
/// the lifetime of the process. Clones share the same flag.
///
/// [`set`]: ShutdownHandle::set
/// [`is_set`]: ShutdownHandle::is_set
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent and safe to call from a signal task.
    pub fn set(&self) {
        if !self.inner.flag.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether shutdown has been requested
    pub fn is_set(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Block up to `timeout` or until the flag is set; returns whether it
    /// was set. A pre-set flag returns true immediately.
    pub async fn wait(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        // Re-check after registering: set() may have raced the enable.
        if self.is_set() {
            return true;
        }
        tokio::time::timeout(timeout, notified).await.is_ok() || self.is_set()
    }

    /// Wait indefinitely for the flag
    pub async fn cancelled(&self) {
        if self.is_set() {
            return;
        }
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_set() {
            return;
        }
        notified.await;
    }
}

/// Bind SIGINT and SIGTERM to the handle. The handler task sets the flag
/// and exits; it never blocks and never attempts cleanup itself.
pub fn install_signal_handlers(handle: &ShutdownHandle) -> std::io::Result<()> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let handle = handle.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
        #[cfg(not(unix))]
        let _ = tokio::signal::ctrl_c().await;

        info!("shutdown requested");
        handle.set();
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flag_latches() {
        let handle = ShutdownHandle::new();
        assert!(!handle.is_set());

        handle.set();
        assert!(handle.is_set());

        // Setting again keeps it latched.
        handle.set();
        for _ in 0..100 {
            assert!(handle.is_set());
        }
    }

    #[tokio::test]
    async fn clones_share_the_flag() {
        let handle = ShutdownHandle::new();
        let clone = handle.clone();
        clone.set();
        assert!(handle.is_set());
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_preset() {
        let handle = ShutdownHandle::new();
        handle.set();
        assert!(handle.wait(Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn wait_times_out_when_unset() {
        let handle = ShutdownHandle::new();
        assert!(!handle.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn wait_wakes_on_set() {
        let handle = ShutdownHandle::new();
        let waiter = handle.clone();
        let join = tokio::spawn(async move { waiter.wait(Duration::from_secs(30)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.set();

        assert!(join.await.unwrap());
    }

    #[tokio::test]
    async fn cancelled_completes_after_set() {
        let handle = ShutdownHandle::new();
        let waiter = handle.clone();
        let join = tokio::spawn(async move { waiter.cancelled().await });

        handle.set();
        join.await.unwrap();
    }
}
