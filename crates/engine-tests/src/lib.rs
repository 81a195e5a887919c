#![allow(dead_code)]

pub mod fake_server;
pub mod utils;
