//! SQLite backend for the ClaimStore.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The single connection thread also
//! serialises writers; every mutation additionally takes the write lock up
//! front with `BEGIN IMMEDIATE`.

mod encode;
mod equivalence;
mod query;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
