use connectors::store::StoreConnector;
use engine_core::error_channel::ErrorSender;
use engine_processing::producer::{DataProducer, ProducerContext, reader::TableReader};
use model::execution::spec::FileImportSpec;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Starts one reader per file. Failures are forwarded to the error channel;
/// a reader stopped by cancellation reports nothing.
pub fn spawn_readers(
    specs: Vec<FileImportSpec>,
    connector: Arc<dyn StoreConnector>,
    ctx: &ProducerContext,
    errors: &ErrorSender,
) -> JoinSet<()> {
    let mut readers = JoinSet::new();
    for spec in specs {
        let mut reader = TableReader::new(spec.clone(), connector.clone(), ctx.clone());
        let errors = errors.clone();
        let metrics = ctx.metrics.clone();

        readers.spawn(async move {
            let Err(err) = reader.run().await else {
                return;
            };
            match err.into_report(&spec) {
                Some(report) => {
                    error!(file = %spec.path.display(), table = %spec.destination, "Reader failed: {}", report.message);
                    metrics.increment_failures(1);
                    errors.report(report);
                }
                None => debug!(file = %spec.path.display(), "Reader cancelled"),
            }
        });
    }
    readers
}
