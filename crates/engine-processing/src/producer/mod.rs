use crate::error::ProducerError;
use async_trait::async_trait;
use engine_config::BatchLimits;
use engine_core::{dispatch::DispatchSender, metrics::Metrics};
use tokio_util::sync::CancellationToken;

pub mod batcher;
pub mod reader;

/// Shared state handed to every reader of a run.
#[derive(Debug, Clone)]
pub struct ProducerContext {
    pub dispatch: DispatchSender,
    pub cancel: CancellationToken,
    pub limits: BatchLimits,
    pub read_chunk_size: usize,
    pub metrics: Metrics,
}

#[async_trait]
pub trait DataProducer {
    /// Executes the producer's main loop and returns the number of batches
    /// it dispatched.
    async fn run(&mut self) -> Result<usize, ProducerError>;
}
