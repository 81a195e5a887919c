use crate::store::error::StoreError;
use async_trait::async_trait;
use model::core::{identifiers::TableRef, value::Record};
use serde::Deserialize;

pub mod error;
pub mod memory;

/// Subset of a table's metadata the importer cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableInfo {
    pub primary_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    #[default]
    Soft,
    Hard,
}

impl Durability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Durability::Soft => "soft",
            Durability::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOptions {
    /// Replace rows whose primary key already exists instead of failing them.
    pub upsert: bool,
    pub durability: Durability,
}

/// Per-call outcome of a bulk insert as reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InsertSummary {
    pub inserted: u64,
    pub replaced: u64,
    pub unchanged: u64,
    pub errors: u64,
    pub first_error: Option<String>,
}

/// Opens connections to a store. Shared by every reader and worker of a run.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError>;

    /// Human readable address, used in log and error messages.
    fn describe(&self) -> String;
}

/// One open session with the store. Not shared between tasks.
#[async_trait]
pub trait StoreConnection: Send {
    async fn list_databases(&mut self) -> Result<Vec<String>, StoreError>;
    async fn create_database(&mut self, db: &str) -> Result<(), StoreError>;
    async fn list_tables(&mut self, db: &str) -> Result<Vec<String>, StoreError>;

    async fn create_table(
        &mut self,
        table: &TableRef,
        primary_key: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn table_info(&mut self, table: &TableRef) -> Result<TableInfo, StoreError>;

    async fn bulk_insert(
        &mut self,
        table: &TableRef,
        records: &[Record],
        options: InsertOptions,
    ) -> Result<InsertSummary, StoreError>;
}
