use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Coalesces rapid calls into one action after a quiet period.
///
/// Each `call` cancels the pending action, if any, and re-arms the timer.
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<Armed>,
    tracker: TaskTracker,
}

/// One armed action. Whoever sets `claimed` first, the timer or `cancel`,
/// decides whether it runs.
#[derive(Debug)]
struct Armed {
    token: CancellationToken,
    claimed: Arc<AtomicBool>,
}

impl Armed {
    fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            tracker: TaskTracker::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` once `delay` has passed without another call.
    pub fn call<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let armed = Armed {
            token: CancellationToken::new(),
            claimed: Arc::new(AtomicBool::new(false)),
        };
        let token = armed.token.clone();
        let claimed = armed.claimed.clone();
        let delay = self.delay;
        self.tracker.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !claimed.swap(true, Ordering::AcqRel) {
                        action.await;
                    }
                }
            }
        });
        self.pending = Some(armed);
    }

    /// Drop the pending action. Returns whether one was still waiting to fire;
    /// when it returns `true` the action is guaranteed never to run.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(armed) => {
                let waiting = armed.claim();
                armed.token.cancel();
                waiting
            }
            None => false,
        }
    }

    /// Whether an action is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|armed| !armed.claimed.load(Ordering::Acquire))
    }

    /// Wait until every armed or running action has finished.
    pub async fn idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
