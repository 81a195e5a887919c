use crate::error::PlanError;
use model::core::identifiers::{IdentifierError, TableRef, is_valid_name};
use std::collections::BTreeSet;

/// Restricts a directory import to some databases and tables.
/// An empty filter lets everything through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportFilter {
    dbs: BTreeSet<String>,
    tables: BTreeSet<TableRef>,
}

impl ImportFilter {
    /// Parses `db` and `db.table` entries.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, PlanError> {
        let mut filter = Self::default();
        for entry in entries.iter().map(AsRef::as_ref) {
            if !is_valid_name(entry) {
                return Err(IdentifierError::InvalidName(entry.to_string()).into());
            }
            if entry.contains('.') {
                filter.tables.insert(entry.parse()?);
            } else {
                filter.dbs.insert(entry.to_string());
            }
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.dbs.is_empty() && self.tables.is_empty()
    }

    /// Whether anything inside `db` can pass the filter.
    pub fn allows_db(&self, db: &str) -> bool {
        self.is_empty() || self.dbs.contains(db) || self.tables.iter().any(|t| t.db == db)
    }

    pub fn allows(&self, table: &TableRef) -> bool {
        self.is_empty() || self.dbs.contains(&table.db) || self.tables.contains(table)
    }

    /// The table selected when the filter names exactly one table and no
    /// whole database.
    pub fn single_table(&self) -> Option<&TableRef> {
        match (self.dbs.is_empty(), self.tables.len()) {
            (true, 1) => self.tables.iter().next(),
            _ => None,
        }
    }
}
