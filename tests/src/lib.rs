//! Shared helpers for the integration tests: a scripted source, raw extract
//! fixtures, and a context wiring both to an in-memory store.

pub mod fixtures;
pub mod mocks;
pub mod setup;
