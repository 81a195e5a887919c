pub mod discovery;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod plan;
