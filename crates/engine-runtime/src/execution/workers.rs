use connectors::store::StoreConnector;
use engine_config::ImportSettings;
use engine_core::{
    abort::{AbortController, LiveWorkers},
    dispatch::DispatchReceiver,
    error_channel::ErrorSender,
    metrics::Metrics,
};
use engine_processing::consumer::{DataConsumer, worker::ImportWorker};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Everything a worker pool needs besides its size.
pub struct PoolContext {
    pub connector: Arc<dyn StoreConnector>,
    pub queue: DispatchReceiver,
    pub abort: AbortController,
    pub errors: ErrorSender,
    pub metrics: Metrics,
    pub live: LiveWorkers,
}

/// Starts `settings.clients` workers. Each worker is counted as live before
/// its task is spawned, so a stop broadcast never misses one.
pub fn spawn_pool(settings: &ImportSettings, ctx: &PoolContext) -> JoinSet<()> {
    info!(workers = settings.clients, "Launching workers");

    let mut pool = JoinSet::new();
    for id in 0..settings.clients {
        let mut worker = ImportWorker::new(
            id,
            ctx.connector.clone(),
            ctx.queue.clone(),
            ctx.abort.clone(),
            settings.insert_options(),
            ctx.metrics.clone(),
            ctx.live.register(),
        );
        let errors = ctx.errors.clone();

        pool.spawn(async move {
            if let Err(err) = worker.run().await {
                error!(worker = worker.id(), "Worker failed: {}", err);
                errors.report(err.into_report());
            }
        });
    }
    pool
}
