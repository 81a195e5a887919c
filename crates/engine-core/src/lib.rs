pub mod abort;
pub mod dispatch;
pub mod error;
pub mod error_channel;
pub mod metrics;
