use crate::{
    consumer::{DataConsumer, writer::BatchWriter},
    error::ConsumerError,
};
use async_trait::async_trait;
use connectors::store::{InsertOptions, StoreConnector};
use engine_core::{
    abort::{AbortController, LiveGuard},
    dispatch::{DispatchReceiver, WorkItem},
    metrics::Metrics,
};
use std::sync::Arc;
use tracing::{debug, info};

/// A long-lived consumer of the dispatch queue with its own connection.
///
/// The worker exits on a stop sentinel, on its first failed insert, or when
/// it picks up a batch after the run was interrupted. It counts as live until
/// it is dropped.
pub struct ImportWorker {
    id: usize,
    connector: Arc<dyn StoreConnector>,
    queue: DispatchReceiver,
    abort: AbortController,
    writer: BatchWriter,
    _live: LiveGuard,
}

impl ImportWorker {
    pub fn new(
        id: usize,
        connector: Arc<dyn StoreConnector>,
        queue: DispatchReceiver,
        abort: AbortController,
        options: InsertOptions,
        metrics: Metrics,
        live: LiveGuard,
    ) -> Self {
        Self {
            id,
            connector,
            queue,
            abort,
            writer: BatchWriter::new(options, metrics),
            _live: live,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

#[async_trait]
impl DataConsumer for ImportWorker {
    async fn run(&mut self) -> Result<(), ConsumerError> {
        let mut conn = self
            .connector
            .connect()
            .await
            .map_err(|source| ConsumerError::Connect { source })?;
        debug!(worker = self.id, "Worker connected");

        let mut written = 0usize;
        while let Some(item) = self.queue.next().await {
            let batch = match item {
                WorkItem::Batch(batch) => batch,
                WorkItem::Stop => break,
            };

            if self.abort.is_interrupted() {
                debug!(
                    worker = self.id,
                    table = %batch.destination,
                    rows = batch.len(),
                    "Discarding batch after interrupt"
                );
                break;
            }

            self.writer.write_batch(&mut *conn, &batch).await?;
            written += 1;
        }

        info!(worker = self.id, batches = written, "Worker finished");
        Ok(())
    }
}
