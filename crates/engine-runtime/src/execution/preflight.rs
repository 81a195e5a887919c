//! Checks run against the store once, before any file is read.

use crate::error::ImportError;
use connectors::store::StoreConnector;
use model::{core::identifiers::TableRef, execution::spec::FileImportSpec};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Creates missing databases and validates destination tables that already
/// exist. Without `force`, any existing destination rejects the whole import.
///
/// A spec without a primary key adopts the key of its existing table.
pub async fn prepare(
    specs: &mut [FileImportSpec],
    connector: &dyn StoreConnector,
    force: bool,
) -> Result<(), ImportError> {
    let mut conn = connector.connect().await?;
    info!(address = %connector.describe(), "Connected to store");

    let existing_dbs: BTreeSet<String> = conn.list_databases().await?.into_iter().collect();
    let wanted: BTreeSet<&str> = specs.iter().map(|s| s.destination.db.as_str()).collect();
    for db in wanted.into_iter().filter(|db| !existing_dbs.contains(*db)) {
        conn.create_database(db).await?;
        info!(db, "Created database");
    }

    let mut already_exist = Vec::new();
    for spec in specs.iter_mut() {
        let table = &spec.destination;
        let tables = conn.list_tables(&table.db).await?;
        if !tables.iter().any(|name| name == &table.table) {
            if spec.primary_key.is_none() {
                info!(table = %table, "No primary key specified, using the default primary key");
            }
            continue;
        }

        let existing = conn.table_info(table).await?.primary_key;
        let declared = spec.primary_key.get_or_insert_with(|| existing.clone());
        if *declared != existing {
            return Err(ImportError::PrimaryKeyMismatch {
                table: table.clone(),
                existing,
                declared: declared.clone(),
            });
        }
        already_exist.push(table.clone());
    }

    if !already_exist.is_empty() {
        already_exist.sort();
        if !force {
            return Err(ImportError::TablesExist(already_exist));
        }
        warn!(
            tables = %join_tables(&already_exist),
            "Importing into existing tables"
        );
    }
    Ok(())
}

fn join_tables(tables: &[TableRef]) -> String {
    tables
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
