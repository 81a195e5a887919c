use crate::{
    error::ProducerError,
    producer::ProducerContext,
    transform::{Transform, projection::FieldProjection},
};
use engine_config::BatchLimits;
use engine_core::{dispatch::DispatchSender, metrics::Metrics};
use model::{
    core::value::Record,
    execution::spec::FileImportSpec,
    records::batch::Batch,
};
use serde_json::Value;
use std::{path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Groups the records of one file into bounded batches and hands each full
/// batch to the dispatch queue.
pub struct RecordBatcher {
    current: Batch,
    limits: BatchLimits,
    projection: Option<FieldProjection>,
    dispatch: DispatchSender,
    cancel: CancellationToken,
    metrics: Metrics,
    batches_sent: usize,
}

impl RecordBatcher {
    pub fn new(spec: &FileImportSpec, ctx: &ProducerContext) -> Self {
        let source: Arc<Path> = Arc::from(spec.path.as_path());
        Self {
            current: Batch::new(source, spec.destination.clone()),
            limits: ctx.limits,
            projection: FieldProjection::from_allow_list(spec.fields.as_deref()),
            dispatch: ctx.dispatch.clone(),
            cancel: ctx.cancel.clone(),
            metrics: ctx.metrics.clone(),
            batches_sent: 0,
        }
    }

    /// Accepts one decoded element, which must be an object.
    pub fn push_value(&mut self, value: Value) -> Result<(), ProducerError> {
        self.check_cancelled()?;
        let record = Record::try_from(value)?;
        self.append(record)
    }

    pub fn push(&mut self, record: Record) -> Result<(), ProducerError> {
        self.check_cancelled()?;
        self.append(record)
    }

    /// Flushes the remainder and returns how many batches were dispatched.
    pub fn finish(mut self) -> Result<usize, ProducerError> {
        self.flush()?;
        Ok(self.batches_sent)
    }

    fn check_cancelled(&self) -> Result<(), ProducerError> {
        if self.cancel.is_cancelled() {
            return Err(ProducerError::Cancelled);
        }
        Ok(())
    }

    fn append(&mut self, mut record: Record) -> Result<(), ProducerError> {
        if let Some(projection) = &self.projection {
            projection.apply(&mut record);
        }

        let encoded_len = record.encoded_len();
        self.current.push(record, encoded_len);
        self.metrics.increment_records_read(1);

        if self.limits.is_full(self.current.len(), self.current.size_bytes) {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ProducerError> {
        if self.current.is_empty() {
            return Ok(());
        }

        let batch = self.current.take();
        debug!(
            table = %batch.destination,
            batch_no = self.batches_sent + 1,
            rows = batch.len(),
            bytes = batch.size_bytes,
            "Dispatching batch"
        );
        self.metrics.increment_batches(1);
        self.metrics.increment_bytes(batch.size_bytes as u64);
        self.dispatch.dispatch(batch)?;
        self.batches_sent += 1;
        Ok(())
    }
}
