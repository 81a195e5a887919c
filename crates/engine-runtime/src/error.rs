use connectors::store::error::StoreError;
use engine_config::SettingsError;
use model::core::identifiers::TableRef;
use planner::error::PlanError;
use thiserror::Error;

/// Errors that stop an import before any record is read.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("{0}")]
    Plan(#[from] PlanError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{}", tables_exist_message(.0))]
    TablesExist(Vec<TableRef>),

    #[error("Table '{table}' already exists with a different primary key ('{existing}', expected '{declared}')")]
    PrimaryKeyMismatch {
        table: TableRef,
        existing: String,
        declared: String,
    },
}

fn tables_exist_message(tables: &[TableRef]) -> String {
    match tables {
        [table] => format!(
            "Table '{table}' already exists, run with --force to import into the existing table"
        ),
        _ => {
            let listed = tables
                .iter()
                .map(|t| format!("  {t}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "The following tables already exist, run with --force to import into the existing tables:\n{listed}"
            )
        }
    }
}
