//! Core types and trait definitions for the Accord contract broker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod deployment;
pub mod error;
pub mod pact;
pub mod pacticipant;
pub mod query;
pub mod store;
pub mod version;

pub use error::{Fault, FaultKind};
