use thiserror::Error;

/// The dispatch queue has no receivers left.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("dispatch queue is closed")]
pub struct DispatchClosed;
