use crate::error::PlanError;
use serde::Deserialize;
use std::{fs, path::Path};

pub const SIDECAR_EXTENSION: &str = "info";

/// Table description stored next to each exported data file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSidecar {
    pub primary_key: String,
}

impl TableSidecar {
    pub fn read(path: &Path) -> Result<Self, PlanError> {
        let contents = fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| PlanError::InvalidSidecar {
            path: path.to_path_buf(),
            source,
        })
    }
}
