//! Process-local store for tests. Exercises the import pipeline without a
//! server.

use crate::store::{
    InsertOptions, InsertSummary, StoreConnection, StoreConnector, TableInfo, error::StoreError,
};
use async_trait::async_trait;
use model::core::{identifiers::TableRef, value::Record};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tracing::debug;

const DEFAULT_PRIMARY_KEY: &str = "id";

#[derive(Debug, Default)]
struct MemoryTable {
    primary_key: String,
    rows: Vec<Record>,
    index: HashMap<String, usize>,
    generated_keys: u64,
}

impl MemoryTable {
    fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            ..Default::default()
        }
    }

    fn insert(&mut self, mut record: Record, upsert: bool, summary: &mut InsertSummary) {
        let key = match record.get(&self.primary_key) {
            Some(value) => key_string(value),
            None => {
                self.generated_keys += 1;
                let key = format!("generated-{}", self.generated_keys);
                record.insert(self.primary_key.clone(), Value::String(key.clone()));
                key_string(&Value::String(key))
            }
        };

        match self.index.get(&key) {
            Some(&slot) if upsert => {
                if self.rows[slot] == record {
                    summary.unchanged += 1;
                } else {
                    self.rows[slot] = record;
                    summary.replaced += 1;
                }
            }
            Some(_) => {
                summary.errors += 1;
                summary.first_error.get_or_insert_with(|| {
                    format!("Duplicate primary key `{}`: {key}", self.primary_key)
                });
            }
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push(record);
                summary.inserted += 1;
            }
        }
    }
}

fn key_string(value: &Value) -> String {
    value.to_string()
}

#[derive(Debug, Default)]
struct MemoryState {
    databases: BTreeMap<String, BTreeMap<String, MemoryTable>>,
    refuse_connections: bool,
    insert_delay: Option<Duration>,
    failing_tables: HashMap<TableRef, String>,
    connections: usize,
    insert_calls: usize,
    batch_sizes: Vec<usize>,
}

/// Cloning yields another handle onto the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(self, db: &str) -> Self {
        self.lock().databases.entry(db.to_string()).or_default();
        self
    }

    pub fn with_table(self, table: &TableRef, primary_key: &str) -> Self {
        self.lock()
            .databases
            .entry(table.db.clone())
            .or_default()
            .insert(table.table.clone(), MemoryTable::new(primary_key));
        self
    }

    /// Every `connect` call fails as if the server were unreachable.
    pub fn refuse_connections(self) -> Self {
        self.lock().refuse_connections = true;
        self
    }

    /// Slows each bulk insert down, to keep batches in flight.
    pub fn with_insert_delay(self, delay: Duration) -> Self {
        self.lock().insert_delay = Some(delay);
        self
    }

    /// Makes every bulk insert into `table` fail with a runtime error.
    pub fn fail_inserts_into(self, table: &TableRef, message: &str) -> Self {
        self.lock()
            .failing_tables
            .insert(table.clone(), message.to_string());
        self
    }

    pub fn connection_count(&self) -> usize {
        self.lock().connections
    }

    pub fn insert_calls(&self) -> usize {
        self.lock().insert_calls
    }

    /// Record count of every bulk insert, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().batch_sizes.clone()
    }

    pub fn rows(&self, table: &TableRef) -> Vec<Record> {
        self.lock()
            .databases
            .get(&table.db)
            .and_then(|tables| tables.get(&table.table))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn has_table(&self, table: &TableRef) -> bool {
        self.lock()
            .databases
            .get(&table.db)
            .is_some_and(|tables| tables.contains_key(&table.table))
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        let mut state = self.lock();
        if state.refuse_connections {
            return Err(StoreError::Connect {
                address: self.describe(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ),
            });
        }
        state.connections += 1;
        debug!(connections = state.connections, "Opened in-memory connection");

        Ok(Box::new(MemoryConnection {
            store: self.clone(),
        }))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

pub struct MemoryConnection {
    store: MemoryStore,
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn list_databases(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.store.lock().databases.keys().cloned().collect())
    }

    async fn create_database(&mut self, db: &str) -> Result<(), StoreError> {
        let mut state = self.store.lock();
        if state.databases.contains_key(db) {
            return Err(StoreError::Runtime(format!("Database `{db}` already exists.")));
        }
        state.databases.insert(db.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn list_tables(&mut self, db: &str) -> Result<Vec<String>, StoreError> {
        self.store
            .lock()
            .databases
            .get(db)
            .map(|tables| tables.keys().cloned().collect())
            .ok_or_else(|| StoreError::Runtime(format!("Database `{db}` does not exist.")))
    }

    async fn create_table(
        &mut self,
        table: &TableRef,
        primary_key: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.store.lock();
        let tables = state.databases.get_mut(&table.db).ok_or_else(|| {
            StoreError::Runtime(format!("Database `{}` does not exist.", table.db))
        })?;
        if tables.contains_key(&table.table) {
            return Err(StoreError::Runtime(format!("Table `{table}` already exists.")));
        }
        tables.insert(
            table.table.clone(),
            MemoryTable::new(primary_key.unwrap_or(DEFAULT_PRIMARY_KEY)),
        );
        Ok(())
    }

    async fn table_info(&mut self, table: &TableRef) -> Result<TableInfo, StoreError> {
        self.store
            .lock()
            .databases
            .get(&table.db)
            .and_then(|tables| tables.get(&table.table))
            .map(|t| TableInfo {
                primary_key: t.primary_key.clone(),
            })
            .ok_or_else(|| StoreError::Runtime(format!("Table `{table}` does not exist.")))
    }

    async fn bulk_insert(
        &mut self,
        table: &TableRef,
        records: &[Record],
        options: InsertOptions,
    ) -> Result<InsertSummary, StoreError> {
        let delay = self.store.lock().insert_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.store.lock();
        state.insert_calls += 1;
        state.batch_sizes.push(records.len());

        if let Some(message) = state.failing_tables.get(table) {
            return Err(StoreError::Runtime(message.clone()));
        }

        let target = state
            .databases
            .get_mut(&table.db)
            .and_then(|tables| tables.get_mut(&table.table))
            .ok_or_else(|| StoreError::Runtime(format!("Table `{table}` does not exist.")))?;

        let mut summary = InsertSummary::default();
        for record in records {
            target.insert(record.clone(), options.upsert, &mut summary);
        }
        Ok(summary)
    }
}
