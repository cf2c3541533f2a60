//! Domain types and rules for industrial-safety certification tracking.
//!
//! This crate has no HTTP or database dependencies. It defines the records,
//! the expiry classifier, the competency matcher and gap report, the order
//! workflow, and the [`store::ComplianceStore`] trait that backends
//! implement.

// Native `async fn` in traits; the store trait spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod certification;
pub mod competency;
pub mod compliance;
pub mod error;
pub mod matrix;
pub mod order;
pub mod organization;
pub mod person;
pub mod record;
pub mod store;

pub use error::{Classify, Error, ErrorClass, Result};
pub use record::{Record, RecordFilter, RecordKind, Relation};
