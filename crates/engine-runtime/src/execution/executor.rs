use crate::{
    error::ImportError,
    execution::{
        readers,
        workers::{self, PoolContext},
    },
};
use connectors::store::StoreConnector;
use engine_config::ImportSettings;
use engine_core::{
    abort::{AbortController, LiveWorkers},
    dispatch::dispatch_queue,
    error_channel::{ErrorReceiver, error_channel},
    metrics::{Metrics, MetricsSnapshot},
};
use engine_processing::producer::ProducerContext;
use model::execution::{
    report::{ErrorKind, ErrorReport, RunStatus},
    spec::FileImportSpec,
};
use planner::plan::ImportPlan;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct ImportOutcome {
    pub status: RunStatus,
    pub metrics: MetricsSnapshot,
    pub elapsed: Duration,
}

/// Imports every file in `specs` and reports how the run ended.
///
/// `Err` is returned only for problems found before any task starts. Once
/// the pipeline is running, failures end up in the returned status. Cancelling
/// `interrupt` stops the run early with [`RunStatus::Interrupted`].
pub async fn run(
    specs: Vec<FileImportSpec>,
    settings: &ImportSettings,
    connector: Arc<dyn StoreConnector>,
    interrupt: CancellationToken,
) -> Result<ImportOutcome, ImportError> {
    settings.validate()?;
    let plan = ImportPlan::new(specs)?;

    let started = Instant::now();
    info!(
        files = plan.len(),
        workers = settings.clients,
        address = %connector.describe(),
        "Starting import"
    );

    let (dispatch, queue) = dispatch_queue();
    let (errors, mut error_rx) = error_channel();
    let live = LiveWorkers::new();
    let metrics = Metrics::new();
    let mut supervisor = Supervisor {
        abort: AbortController::new(CancellationToken::new(), dispatch.clone(), live.clone()),
        metrics: metrics.clone(),
        reports: Vec::new(),
    };

    let mut pool = workers::spawn_pool(
        settings,
        &PoolContext {
            connector: connector.clone(),
            queue: queue.clone(),
            abort: supervisor.abort.clone(),
            errors: errors.clone(),
            metrics: metrics.clone(),
            live: live.clone(),
        },
    );

    let ctx = ProducerContext {
        dispatch: dispatch.clone(),
        cancel: supervisor.abort.token().clone(),
        limits: settings.limits,
        read_chunk_size: settings.read_chunk_size,
        metrics: metrics.clone(),
    };
    let mut readers = readers::spawn_readers(plan.into_specs(), connector, &ctx, &errors);
    drop(ctx);

    supervisor
        .supervise(&mut readers, &mut error_rx, &interrupt, "reader")
        .await;
    info!("All readers finished, stopping workers");
    if dispatch.stop(live.count()).is_err() {
        warn!("Dispatch queue closed before workers were stopped");
    }

    supervisor
        .supervise(&mut pool, &mut error_rx, &interrupt, "worker")
        .await;
    for report in error_rx.try_recv_all() {
        supervisor.record(report);
    }

    let residual = queue.drain_residual().await;
    let status = supervisor.finish(residual);
    let elapsed = started.elapsed();
    info!(
        status = status_label(&status),
        duration_ms = elapsed.as_millis() as u64,
        "Import finished"
    );

    Ok(ImportOutcome {
        status,
        metrics: metrics.snapshot(),
        elapsed,
    })
}

/// Collects failure reports for one run and turns them into its status.
struct Supervisor {
    abort: AbortController,
    metrics: Metrics,
    reports: Vec<ErrorReport>,
}

impl Supervisor {
    /// Waits for every task in `tasks` while collecting reports and reacting
    /// to an interrupt.
    async fn supervise(
        &mut self,
        tasks: &mut JoinSet<()>,
        error_rx: &mut ErrorReceiver,
        interrupt: &CancellationToken,
        role: &str,
    ) {
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(())) => {}
                    Some(Err(err)) => {
                        error!(role, "Task ended abnormally: {}", err);
                        self.metrics.increment_failures(1);
                        self.record(ErrorReport::new(
                            ErrorKind::Internal,
                            format!("{role} task ended abnormally: {err}"),
                        ));
                    }
                },
                Some(report) = error_rx.recv() => self.record(report),
                _ = interrupt.cancelled(), if !self.abort.is_interrupted() => {
                    warn!("Interrupt received");
                    self.abort.interrupt();
                }
            }
        }
    }

    fn record(&mut self, report: ErrorReport) {
        if report.is_cancellation() {
            return;
        }
        self.reports.push(report);
        self.abort.fail_fast();
    }

    fn finish(self, residual: usize) -> RunStatus {
        if self.abort.is_interrupted() {
            if residual > 0 {
                info!(batches = residual, "Discarded queued batches after interrupt");
            }
            return RunStatus::Interrupted;
        }

        let mut reports = self.reports;
        if residual > 0 {
            error!(batches = residual, "Work queue not empty after all workers stopped");
            reports.push(ErrorReport::new(
                ErrorKind::QueueInvariant,
                format!("{residual} batch(es) were left on the work queue"),
            ));
        }

        if reports.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Failed(reports)
        }
    }
}

fn status_label(status: &RunStatus) -> &'static str {
    match status {
        RunStatus::Success => "success",
        RunStatus::Interrupted => "interrupted",
        RunStatus::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::store::memory::MemoryStore;
    use model::{core::identifiers::TableRef, execution::spec::FileFormat};
    use planner::error::PlanError;
    use std::{fs, path::PathBuf};
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn json_rows(count: usize) -> String {
        let rows: Vec<String> = (0..count).map(|i| format!(r#"{{"id": {i}, "n": "row {i}"}}"#)).collect();
        format!("[{}]", rows.join(",\n"))
    }

    fn settings() -> ImportSettings {
        ImportSettings::default().with_clients(4)
    }

    #[traced_test]
    #[tokio::test]
    async fn test_every_file_is_imported() {
        let dir = TempDir::new().unwrap();
        let people = write(&dir, "people.json", &json_rows(450));
        let pets = write(&dir, "pets.csv", "id,name\n1,Rex\n2,Tom\n");
        let store = MemoryStore::new().with_database("test");

        let specs = vec![
            FileImportSpec::new(&people, FileFormat::Json, TableRef::new("test", "people")),
            FileImportSpec::new(&pets, FileFormat::Csv, TableRef::new("test", "pets")),
        ];
        let outcome = run(specs, &settings(), Arc::new(store.clone()), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(store.rows(&TableRef::new("test", "people")).len(), 450);
        assert_eq!(store.rows(&TableRef::new("test", "pets")).len(), 2);
        assert_eq!(outcome.metrics.records_inserted, 452);
        assert_eq!(outcome.metrics.batches_dispatched, 4);

        let mut sizes = store.batch_sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![2, 50, 200, 200]);
        assert!(logs_contain("Import finished"));
    }

    #[tokio::test]
    async fn test_duplicate_destination_fails_before_connecting() {
        let store = MemoryStore::new().with_database("test");
        let t = TableRef::new("test", "t");
        let specs = vec![
            FileImportSpec::new("a.json", FileFormat::Json, t.clone()),
            FileImportSpec::new("b.csv", FileFormat::Csv, t),
        ];

        let err = run(specs, &settings(), Arc::new(store.clone()), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Plan(PlanError::DuplicateDestination(_))));
        assert_eq!(store.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_settings_are_rejected() {
        let err = run(
            Vec::new(),
            &ImportSettings::default().with_clients(0),
            Arc::new(MemoryStore::new()),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ImportError::Settings(_)));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_format_error_inserts_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", r#""just a string""#);
        let store = MemoryStore::new().with_database("test");

        let specs = vec![FileImportSpec::new(&path, FileFormat::Json, TableRef::new("test", "bad"))];
        let outcome = run(specs, &settings(), Arc::new(store.clone()), CancellationToken::new())
            .await
            .unwrap();

        let errors = outcome.status.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Format);
        assert_eq!(errors[0].file.as_deref(), Some(path.as_path()));
        assert_eq!(store.insert_calls(), 0);
        assert_eq!(outcome.metrics.failure_count, 1);
    }

    #[tokio::test]
    async fn test_store_rejection_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.json", &json_rows(10));
        let t = TableRef::new("test", "t");
        let store = MemoryStore::new()
            .with_table(&t, "id")
            .fail_inserts_into(&t, "Table is read only");

        let specs = vec![FileImportSpec::new(&path, FileFormat::Json, t.clone())];
        let outcome = run(specs, &settings(), Arc::new(store), CancellationToken::new())
            .await
            .unwrap();

        let errors = outcome.status.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::StoreInsert);
        assert_eq!(errors[0].table.as_ref(), Some(&t));
        assert!(errors[0].message.contains("Table is read only"));
    }

    #[tokio::test]
    async fn test_duplicate_keys_without_upsert_fail() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.json", r#"[{"id": 1}, {"id": 1}]"#);
        let t = TableRef::new("test", "t");
        let store = MemoryStore::new().with_table(&t, "id");

        let specs = vec![FileImportSpec::new(&path, FileFormat::Json, t.clone())];
        let outcome = run(specs.clone(), &settings(), Arc::new(store.clone()), CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(outcome.status, RunStatus::Failed(_)));

        let outcome = run(
            specs,
            &settings().with_upsert(true),
            Arc::new(store.clone()),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(store.rows(&t).len(), 1);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_batches_left_behind_a_failed_worker_are_reported() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.json", &json_rows(2000));
        let t = TableRef::new("test", "t");
        let store = MemoryStore::new()
            .with_table(&t, "id")
            .with_insert_delay(Duration::from_millis(200))
            .fail_inserts_into(&t, "Table is read only");

        let specs = vec![FileImportSpec::new(&path, FileFormat::Json, t)];
        let outcome = run(specs, &settings().with_clients(1), Arc::new(store.clone()), CancellationToken::new())
            .await
            .unwrap();

        let kinds: Vec<ErrorKind> = outcome.status.errors().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::StoreInsert, ErrorKind::QueueInvariant]);
        assert_eq!(store.insert_calls(), 1);
        assert_eq!(outcome.metrics.batches_dispatched, 10);
        assert!(logs_contain("Work queue not empty"));
    }

    #[test]
    fn test_interrupt_discards_collected_reports() {
        let (dispatch, _queue) = dispatch_queue();
        let live = LiveWorkers::new();
        let mut supervisor = Supervisor {
            abort: AbortController::new(CancellationToken::new(), dispatch, live),
            metrics: Metrics::new(),
            reports: Vec::new(),
        };

        supervisor.record(ErrorReport::new(ErrorKind::Format, "unexpected token"));
        assert_eq!(supervisor.reports.len(), 1);
        supervisor.abort.interrupt();

        let status = supervisor.finish(3);
        assert_eq!(status, RunStatus::Interrupted);
        assert!(status.errors().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_connection_errors() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.json", "[]");
        let store = MemoryStore::new().refuse_connections();

        let specs = vec![FileImportSpec::new(&path, FileFormat::Json, TableRef::new("test", "t"))];
        let outcome = run(specs, &settings(), Arc::new(store), CancellationToken::new())
            .await
            .unwrap();

        let errors = outcome.status.errors();
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|e| e.kind == ErrorKind::Connection));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_interrupt_stops_the_run() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "big.json", &json_rows(5000));
        let t = TableRef::new("test", "big");
        let store = MemoryStore::new()
            .with_database("test")
            .with_insert_delay(Duration::from_millis(50));
        let interrupt = CancellationToken::new();

        let handle = tokio::spawn({
            let specs = vec![FileImportSpec::new(&path, FileFormat::Json, t.clone())];
            let connector: Arc<dyn StoreConnector> = Arc::new(store.clone());
            let interrupt = interrupt.clone();
            async move { run(specs, &settings().with_clients(2), connector, interrupt).await }
        });

        while store.insert_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        interrupt.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Interrupted);
        assert!(outcome.status.errors().is_empty());
        assert!(store.insert_calls() < 25);
        assert!(logs_contain("Interrupt received"));
    }
}
