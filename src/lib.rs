//! ndrhunt library interface
//!
//! Exposes core modules for use by the binary and tests.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod models;
pub mod query;
pub mod report;
pub mod rules;
pub mod schema;
pub mod store;
pub mod utils;
