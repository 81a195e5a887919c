use crate::dispatch::DispatchSender;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Number of import workers currently running.
#[derive(Debug, Clone, Default)]
pub struct LiveWorkers(Arc<AtomicUsize>);

impl LiveWorkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Counts the caller as alive until the returned guard is dropped.
    pub fn register(&self) -> LiveGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        LiveGuard(self.0.clone())
    }
}

#[derive(Debug)]
pub struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns the run's cancellation token and records why it was set.
#[derive(Debug, Clone)]
pub struct AbortController {
    token: CancellationToken,
    interrupted: Arc<AtomicBool>,
    dispatch: DispatchSender,
    live: LiveWorkers,
}

impl AbortController {
    pub fn new(token: CancellationToken, dispatch: DispatchSender, live: LiveWorkers) -> Self {
        Self {
            token,
            interrupted: Arc::new(AtomicBool::new(false)),
            dispatch,
            live,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Handles an external interrupt. Only the first call has any effect:
    /// it cancels the run and wakes every live worker with a stop sentinel.
    pub fn interrupt(&self) {
        if self.interrupted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.token.cancel();

        let live = self.live.count();
        info!(live_workers = live, "Interrupted, stopping workers");
        if self.dispatch.stop(live).is_err() {
            warn!("Dispatch queue already closed while stopping workers");
        }
    }

    /// Stops readers early after a failure. Workers keep draining the queue.
    pub fn fail_fast(&self) {
        if !self.token.is_cancelled() {
            info!("Failure reported, stopping readers");
            self.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{WorkItem, dispatch_queue};

    #[test]
    fn test_guard_tracks_live_workers() {
        let live = LiveWorkers::new();
        let first = live.register();
        let second = live.register();
        assert_eq!(live.count(), 2);
        drop(first);
        assert_eq!(live.count(), 1);
        drop(second);
        assert_eq!(live.count(), 0);
    }

    #[tokio::test]
    async fn test_interrupt_wakes_live_workers_once() {
        let (tx, rx) = dispatch_queue();
        let live = LiveWorkers::new();
        let _a = live.register();
        let _b = live.register();
        let abort = AbortController::new(CancellationToken::new(), tx, live);

        abort.interrupt();
        abort.interrupt();

        assert!(abort.is_cancelled());
        assert!(abort.is_interrupted());
        assert!(matches!(rx.next().await, Some(WorkItem::Stop)));
        assert!(matches!(rx.next().await, Some(WorkItem::Stop)));
        assert_eq!(rx.drain_residual().await, 0);
    }

    #[tokio::test]
    async fn test_fail_fast_is_not_an_interrupt() {
        let (tx, rx) = dispatch_queue();
        let abort = AbortController::new(CancellationToken::new(), tx, LiveWorkers::new());

        abort.fail_fast();
        assert!(abort.is_cancelled());
        assert!(!abort.is_interrupted());

        abort.interrupt();
        assert!(abort.is_interrupted());
        drop(abort);
        assert!(rx.next().await.is_none());
    }
}
