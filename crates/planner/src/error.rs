use model::core::identifiers::{IdentifierError, TableRef};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid table info file '{path}': {source}")]
    InvalidSidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// Two inputs target the same table.
    #[error("Duplicate db.table found: {0}")]
    DuplicateDestination(TableRef),

    #[error("File to import does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Directory to import does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
}
