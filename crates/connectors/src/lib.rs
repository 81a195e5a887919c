pub mod file;
pub mod rethinkdb;
pub mod store;
