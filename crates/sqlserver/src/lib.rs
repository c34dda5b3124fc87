//! SQL Server source adapter for the usage analytics pipeline.

pub mod client;
pub mod config;
pub mod convert;
pub mod health;
pub mod params;
pub mod queries;

pub use client::*;
pub use config::*;
pub use params::*;
pub use queries::Extract;
