//! SQLite backend for the Accord broker store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. The whole read path for
//! one listing request executes inside a single transaction on that
//! connection, so the page and every enrichment map reflect the same
//! snapshot.

mod encode;
mod query;
mod schema;
mod store;

pub mod error;
pub mod observer;

pub use error::{Error, Result};
pub use observer::{QueryCounter, QueryObserver};
pub use store::SqliteStore;
