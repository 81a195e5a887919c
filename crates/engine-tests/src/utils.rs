use connectors::store::StoreConnector;
use engine_config::ImportSettings;
use engine_runtime::{
    error::ImportError,
    execution::{
        executor::{self, ImportOutcome},
        preflight,
    },
};
use planner::{discovery::discover, filter::ImportFilter, plan::ImportPlan};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// An export directory laid out as `<db>/<table>.<ext>` plus sidecars.
pub struct ExportDir {
    dir: TempDir,
}

impl ExportDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create export dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a data file and its sidecar.
    pub fn table(&self, db: &str, table: &str, ext: &str, contents: &str, primary_key: &str) -> PathBuf {
        self.file(
            &format!("{db}/{table}.info"),
            &format!(r#"{{"primary_key": "{primary_key}"}}"#),
        );
        self.file(&format!("{db}/{table}.{ext}"), contents)
    }

    pub fn file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().expect("parent dir")).expect("create parent dir");
        fs::write(&path, contents).expect("write fixture");
        path
    }
}

/// A JSON array of `count` objects with ids `0..count`.
pub fn json_rows(count: usize) -> String {
    let rows: Vec<String> = (0..count)
        .map(|i| format!(r#"{{"id": {i}, "name": "user {i}"}}"#))
        .collect();
    format!("[{}]", rows.join(",\n"))
}

/// Runs a directory import the way the command line does: discovery,
/// pre-flight checks, then the pipeline. `settings.upsert` doubles as the
/// force flag.
pub async fn import_directory(
    root: &Path,
    selectors: &[&str],
    settings: &ImportSettings,
    connector: Arc<dyn StoreConnector>,
) -> Result<ImportOutcome, ImportError> {
    let filter = ImportFilter::parse(selectors)?;
    let discovery = discover(root, &filter)?;
    let mut plan = ImportPlan::from_discovery(discovery, None)?;
    preflight::prepare(plan.specs_mut(), connector.as_ref(), settings.upsert).await?;
    executor::run(plan.into_specs(), settings, connector, CancellationToken::new()).await
}

/// Single-file counterpart of [`import_directory`].
pub async fn import_plan(
    mut plan: ImportPlan,
    settings: &ImportSettings,
    connector: Arc<dyn StoreConnector>,
) -> Result<ImportOutcome, ImportError> {
    preflight::prepare(plan.specs_mut(), connector.as_ref(), settings.upsert).await?;
    executor::run(plan.into_specs(), settings, connector, CancellationToken::new()).await
}
