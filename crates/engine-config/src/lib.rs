pub mod settings;

pub use settings::{
    ImportSettings, batch_limits::BatchLimits, error::SettingsError, target::ConnectTarget,
};
