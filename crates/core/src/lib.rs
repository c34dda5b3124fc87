//! Core types, tabular frames, and validation for the usage analytics pipeline.

pub mod calendar;
pub mod error;
pub mod records;
pub mod table;
pub mod tables;

pub use calendar::*;
pub use error::{Error, Result};
pub use records::*;
pub use table::*;
pub use tables::*;
