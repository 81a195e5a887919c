use thiserror::Error;

/// Errors raised while building or validating run settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid connect target '{0}', expected HOST[:PORT]")]
    InvalidTarget(String),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Client count must be at least 1, got {0}")]
    InvalidClients(usize),

    #[error("Invalid batch limits: {0}")]
    InvalidBatchLimits(String),

    #[error("Read chunk size must be at least 1 byte")]
    InvalidChunkSize,

    #[error("Specify exactly one character for the delimiter, got '{0}'")]
    InvalidDelimiter(String),

    /// A header-less CSV file needs field names from somewhere.
    #[error("A custom header is required when the file has no header row")]
    MissingCustomHeader,

    #[error("Invalid field list '{0}'")]
    InvalidFieldList(String),
}
