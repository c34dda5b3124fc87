//! DuckDB analytical store for the usage analytics pipeline.

pub mod client;
pub mod config;
pub mod health;
pub mod query;
pub mod schema;
pub mod write;

pub use client::*;
pub use config::*;
pub use health::*;
pub use schema::{all_tables, init_schema};
pub use write::*;
