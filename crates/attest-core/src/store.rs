//! The `ComplianceStore` trait.
//!
//! Implemented by storage backends (e.g. `attest-store-sqlite`). The API
//! layer depends on this abstraction and receives a store instance at
//! construction time.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  error::Classify,
  matrix::NewCompetencyMatrix,
  order::{AttestationOrder, OrderStatus},
  record::{Record, RecordFilter},
};

/// Counts returned by [`ComplianceStore::upsert_matrices`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatrixUpsert {
  pub created: usize,
  pub updated: usize,
}

/// Abstraction over a compliance-record backend.
///
/// Every record type goes through the same generic operations. Each mutation
/// is atomic: either the record, its links, and any cascaded deletions are
/// all written, or nothing is.
///
/// All methods return `Send` futures so the store can be shared across
/// tasks in a multi-threaded runtime (e.g. behind `axum`).
pub trait ComplianceStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Persist a new record. The store assigns `id` and both timestamps.
  ///
  /// Fails if the input does not validate, if the tenant does not exist, or
  /// if any link points at a missing record, a record of the wrong kind, or
  /// a record in another tenant.
  fn add<R: Record>(
    &self,
    input: R::New,
  ) -> impl Future<Output = Result<R, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if no record of kind `R` has
  /// that id.
  fn get<R: Record>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<R>, Self::Error>> + Send + '_;

  /// Merge `patch` into an existing record and refresh `updated_at`.
  fn update<R: Record>(
    &self,
    id: Uuid,
    patch: R::Patch,
  ) -> impl Future<Output = Result<R, Self::Error>> + Send + '_;

  /// Delete a record. Returns `false` if it did not exist.
  ///
  /// Records of the kinds in [`RecordKind::cascades`] that link to it are
  /// deleted with it. Deletion is refused while anything else still links to
  /// the record or to a cascaded one.
  ///
  /// [`RecordKind::cascades`]: crate::record::RecordKind::cascades
  fn delete<R: Record>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All records of kind `R` matching `filter`, oldest first.
  fn list<R: Record>(
    &self,
    filter: RecordFilter,
  ) -> impl Future<Output = Result<Vec<R>, Self::Error>> + Send + '_;

  /// Move an order along its status workflow.
  fn transition_order(
    &self,
    id: Uuid,
    to: OrderStatus,
  ) -> impl Future<Output = Result<AttestationOrder, Self::Error>> + Send + '_;

  /// Write a batch of matrix rows for one tenant in a single transaction.
  /// A row for an organisation and position that already has a matrix
  /// replaces its required areas.
  fn upsert_matrices(
    &self,
    tenant_id: Uuid,
    matrices: Vec<NewCompetencyMatrix>,
  ) -> impl Future<Output = Result<MatrixUpsert, Self::Error>> + Send + '_;
}
