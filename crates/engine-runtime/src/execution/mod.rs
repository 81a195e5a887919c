pub mod executor;
pub mod preflight;
pub mod readers;
pub mod workers;
