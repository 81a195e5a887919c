use crate::error::ConsumerError;
use connectors::store::{InsertOptions, InsertSummary, StoreConnection};
use engine_core::metrics::Metrics;
use model::records::batch::Batch;
use std::time::Instant;
use tracing::debug;

/// Issues one bulk insert per batch and turns row-level failures into errors.
pub struct BatchWriter {
    options: InsertOptions,
    metrics: Metrics,
}

impl BatchWriter {
    pub fn new(options: InsertOptions, metrics: Metrics) -> Self {
        Self { options, metrics }
    }

    pub async fn write_batch(
        &self,
        conn: &mut dyn StoreConnection,
        batch: &Batch,
    ) -> Result<InsertSummary, ConsumerError> {
        let started = Instant::now();
        let summary = conn
            .bulk_insert(&batch.destination, &batch.records, self.options)
            .await
            .map_err(|source| {
                self.metrics.increment_failures(1);
                ConsumerError::WriteBatch {
                    table: batch.destination.clone(),
                    file: batch.source.to_path_buf(),
                    source,
                }
            })?;

        if summary.errors > 0 {
            self.metrics.increment_failures(summary.errors);
            return Err(ConsumerError::RowErrors {
                table: batch.destination.clone(),
                file: batch.source.to_path_buf(),
                errors: summary.errors,
                message: summary
                    .first_error
                    .clone()
                    .unwrap_or_else(|| "no error message".to_string()),
            });
        }

        self.metrics
            .increment_records_inserted(summary.inserted + summary.replaced + summary.unchanged);
        debug!(
            table = %batch.destination,
            rows = batch.len(),
            inserted = summary.inserted,
            replaced = summary.replaced,
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch written"
        );
        Ok(summary)
    }
}
