//! Timer-reset debouncing.
//!
//! Each [`Debouncer::schedule`] call cancels the pending action and starts a
//! fresh quiescence window. Once the window elapses the action is detached
//! into its own task, so a later `schedule` never cancels work that has
//! already started (an in-flight HTTP request, for instance).

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Debug)]
pub struct Debouncer {
    name: &'static str,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    #[must_use]
    pub const fn new(name: &'static str, delay: Duration) -> Self {
        Self {
            name,
            delay,
            pending: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces any pending action with `action`, to run after the window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            if !previous.is_finished() {
                trace!(debouncer = self.name, "Superseding pending action");
            }
            previous.abort();
        }

        let delay = self.delay;
        let name = self.name;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(debouncer = name, "Quiescence reached, committing");
            tokio::spawn(action);
        }));
    }

    /// Drops the pending action, if it has not committed yet.
    pub fn cancel(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
