//! Finds importable files in an export directory laid out as
//! `DIR/<db>/<table>.<json|csv>` with a `<table>.info` file next to each data
//! file.

use crate::{
    error::PlanError,
    filter::ImportFilter,
    metadata::{SIDECAR_EXTENSION, TableSidecar},
};
use model::{
    core::identifiers::{TableRef, is_valid_name},
    execution::spec::FileFormat,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: FileFormat,
    pub destination: TableRef,
    pub primary_key: String,
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<DiscoveredFile>,
    /// Entries that do not fit the expected layout.
    pub ignored: Vec<PathBuf>,
}

pub fn discover(root: &Path, filter: &ImportFilter) -> Result<Discovery, PlanError> {
    if !root.is_dir() {
        return Err(PlanError::MissingDirectory(root.to_path_buf()));
    }

    let mut discovery = Discovery::default();
    for entry in sorted_entries(root)? {
        if !entry.is_dir() {
            discovery.ignored.push(entry);
            continue;
        }
        let Some(db) = file_name(&entry) else {
            discovery.ignored.push(entry);
            continue;
        };
        if !filter.allows_db(&db) {
            debug!(db = %db, "Skipping database excluded by filter");
            continue;
        }
        scan_database(&entry, &db, filter, &mut discovery)?;
    }

    debug!(
        files = discovery.files.len(),
        ignored = discovery.ignored.len(),
        "Scanned export directory"
    );
    Ok(discovery)
}

fn scan_database(
    dir: &Path,
    db: &str,
    filter: &ImportFilter,
    discovery: &mut Discovery,
) -> Result<(), PlanError> {
    for path in sorted_entries(dir)? {
        if path.is_dir() {
            discovery.ignored.push(path);
            continue;
        }

        let Some(name) = file_name(&path) else {
            discovery.ignored.push(path);
            continue;
        };
        let (table, extension) = match name.split('.').collect::<Vec<_>>().as_slice() {
            [table, extension] => (table.to_string(), extension.to_string()),
            _ => {
                discovery.ignored.push(path);
                continue;
            }
        };

        if extension == SIDECAR_EXTENSION {
            continue;
        }
        let format = match extension.parse::<FileFormat>() {
            Ok(format) => format,
            Err(_) => {
                discovery.ignored.push(path);
                continue;
            }
        };

        let sidecar = dir.join(format!("{table}.{SIDECAR_EXTENSION}"));
        if !sidecar.is_file() || !is_valid_name(db) || !is_valid_name(&table) {
            discovery.ignored.push(path);
            continue;
        }

        let destination = TableRef::new(db, table);
        if !filter.allows(&destination) {
            continue;
        }

        discovery.files.push(DiscoveredFile {
            path,
            format,
            destination,
            primary_key: TableSidecar::read(&sidecar)?.primary_key,
        });
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, PlanError> {
    let io_err = |source| PlanError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
