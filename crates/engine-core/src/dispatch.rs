//! The single hand-off channel between readers and import workers.
//!
//! The queue is unbounded. Every worker pulls from the same receiver, so the
//! receiver sits behind an async mutex and each `next` call hands out exactly
//! one item to exactly one worker.

use crate::error::DispatchClosed;
use model::records::batch::Batch;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

#[derive(Debug)]
pub enum WorkItem {
    Batch(Batch),
    /// Tells the worker that receives it to exit.
    Stop,
}

pub fn dispatch_queue() -> (DispatchSender, DispatchReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        DispatchSender { tx },
        DispatchReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

#[derive(Debug, Clone)]
pub struct DispatchSender {
    tx: mpsc::UnboundedSender<WorkItem>,
}

impl DispatchSender {
    pub fn dispatch(&self, batch: Batch) -> Result<(), DispatchClosed> {
        self.tx
            .send(WorkItem::Batch(batch))
            .map_err(|_| DispatchClosed)
    }

    /// Pushes `count` stop sentinels behind whatever is already queued.
    pub fn stop(&self, count: usize) -> Result<(), DispatchClosed> {
        for _ in 0..count {
            self.tx.send(WorkItem::Stop).map_err(|_| DispatchClosed)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DispatchReceiver {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>,
}

impl DispatchReceiver {
    /// Waits for the next item. `None` once every sender is gone and the
    /// queue is empty.
    pub async fn next(&self) -> Option<WorkItem> {
        self.rx.lock().await.recv().await
    }

    /// Empties the queue without waiting and returns how many batches were
    /// still in it. Stop sentinels are dropped without being counted.
    pub async fn drain_residual(&self) -> usize {
        let mut rx = self.rx.lock().await;
        let mut batches = 0;
        while let Ok(item) = rx.try_recv() {
            if matches!(item, WorkItem::Batch(_)) {
                batches += 1;
            }
        }
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::identifiers::TableRef;
    use std::path::Path;

    fn batch() -> Batch {
        Batch::new(Arc::from(Path::new("a.json")), TableRef::new("db", "t"))
    }

    #[tokio::test]
    async fn test_items_are_delivered_once_in_order() {
        let (tx, rx) = dispatch_queue();
        let other = rx.clone();
        tx.dispatch(batch()).unwrap();
        tx.stop(1).unwrap();

        assert!(matches!(rx.next().await, Some(WorkItem::Batch(_))));
        assert!(matches!(other.next().await, Some(WorkItem::Stop)));
    }

    #[tokio::test]
    async fn test_drain_counts_batches_only() {
        let (tx, rx) = dispatch_queue();
        tx.dispatch(batch()).unwrap();
        tx.stop(3).unwrap();
        tx.dispatch(batch()).unwrap();

        assert_eq!(rx.drain_residual().await, 2);
        assert_eq!(rx.drain_residual().await, 0);
    }

    #[tokio::test]
    async fn test_next_ends_when_senders_are_gone() {
        let (tx, rx) = dispatch_queue();
        drop(tx);
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_fails_without_receivers() {
        let (tx, rx) = dispatch_queue();
        drop(rx);
        assert_eq!(tx.dispatch(batch()), Err(DispatchClosed));
    }
}
