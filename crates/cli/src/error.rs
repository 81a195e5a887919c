use engine_config::SettingsError;
use engine_runtime::error::ImportError;
use model::core::identifiers::IdentifierError;
use planner::error::PlanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    /// Options that are individually valid but do not fit together.
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Settings(#[from] SettingsError),

    #[error("{0}")]
    Plan(#[from] PlanError),

    #[error("{0}")]
    Identifier(#[from] IdentifierError),

    #[error("{0}")]
    Import(#[from] ImportError),
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        CliError::Usage(message.into())
    }
}
