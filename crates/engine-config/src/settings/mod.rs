use crate::settings::{batch_limits::BatchLimits, error::SettingsError, target::ConnectTarget};
use connectors::{
    file::json::DEFAULT_CHUNK_SIZE,
    store::{Durability, InsertOptions},
};
use tracing::{info, warn};

pub mod batch_limits;
pub mod dialect;
pub mod error;
pub mod target;

pub const DEFAULT_CLIENTS: usize = 64;

/// Run-wide parameters shared by every reader and worker of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub target: ConnectTarget,
    pub auth_key: String,
    /// Number of import workers, each with its own connection.
    pub clients: usize,
    /// Overwrite rows whose primary key already exists.
    pub upsert: bool,
    pub limits: BatchLimits,
    pub read_chunk_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            target: ConnectTarget::default(),
            auth_key: String::new(),
            clients: DEFAULT_CLIENTS,
            upsert: false,
            limits: BatchLimits::default(),
            read_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ImportSettings {
    pub fn with_target(mut self, target: ConnectTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_auth_key(mut self, auth_key: impl Into<String>) -> Self {
        self.auth_key = auth_key.into();
        self
    }

    pub fn with_clients(mut self, clients: usize) -> Self {
        self.clients = clients;
        self
    }

    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size;
        self
    }

    pub fn insert_options(&self) -> InsertOptions {
        InsertOptions {
            upsert: self.upsert,
            durability: Durability::Soft,
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.clients == 0 {
            return Err(SettingsError::InvalidClients(self.clients));
        }
        if self.read_chunk_size == 0 {
            return Err(SettingsError::InvalidChunkSize);
        }
        self.limits.validate()?;

        if self.limits.max_records > 10_000 {
            warn!(
                max_records = self.limits.max_records,
                "Batch record limit is very large, inserts may time out"
            );
        }
        info!(
            connect = %self.target,
            clients = self.clients,
            upsert = self.upsert,
            max_records = self.limits.max_records,
            max_bytes = self.limits.max_bytes,
            "Settings validated"
        );
        Ok(())
    }
}
