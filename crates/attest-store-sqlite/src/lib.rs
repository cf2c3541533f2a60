//! SQLite backend for the attest compliance store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each record is one row holding its
//! JSON body; its references live in a separate link table that backs the
//! relation filters and the referential checks.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
