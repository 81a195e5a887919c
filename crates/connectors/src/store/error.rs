use thiserror::Error;

/// Errors raised while talking to the destination store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The TCP connection could not be opened.
    #[error("Unable to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    /// The server rejected the handshake, usually a bad auth key.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Compile error: {0}")]
    Compile(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl StoreError {
    /// True when the failure is about reaching the store at all, as opposed
    /// to a query it refused.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            StoreError::Connect { .. } | StoreError::Handshake(_) | StoreError::Io(_)
        )
    }
}
