//! The [`Record`] abstraction shared by every stored entity.
//!
//! Each entity type names its [`RecordKind`], the typed input used to create
//! it (`New`), the partial update merged into it (`Patch`), and the
//! [`Link`]s it holds to other records. Storage backends use the links for
//! `getBy<Relation>` filters and referential checks.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::Result;

// ─── Kinds and relations ─────────────────────────────────────────────────────

/// Discriminant stored alongside each record.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  AsRefStr,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
  Tenant,
  Organization,
  Department,
  Facility,
  Position,
  Person,
  Personnel,
  Competency,
  Certification,
  Matrix,
  Order,
}

impl RecordKind {
  /// Kinds deleted together with a record of this kind when they link to it.
  pub fn cascades(self) -> &'static [RecordKind] {
    match self {
      Self::Person => &[Self::Personnel, Self::Certification],
      _ => &[],
    }
  }
}

/// A named reference from one record to another.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  AsRefStr,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Relation {
  Organization,
  Department,
  ParentDepartment,
  ParentFacility,
  Position,
  Person,
  Personnel,
  Competency,
}

impl Relation {
  /// The kind of record a link with this relation must point at.
  pub fn target(self) -> RecordKind {
    match self {
      Self::Organization => RecordKind::Organization,
      Self::Department | Self::ParentDepartment => RecordKind::Department,
      Self::ParentFacility => RecordKind::Facility,
      Self::Position => RecordKind::Position,
      Self::Person => RecordKind::Person,
      Self::Personnel => RecordKind::Personnel,
      Self::Competency => RecordKind::Competency,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
  pub relation: Relation,
  pub target:   Uuid,
}

impl Link {
  pub fn new(relation: Relation, target: Uuid) -> Self {
    Self { relation, target }
  }
}

/// Collect the links of a record, skipping unset optional references.
pub(crate) fn links<const N: usize>(
  pairs: [(Relation, Option<Uuid>); N],
) -> Vec<Link> {
  pairs
    .into_iter()
    .filter_map(|(relation, target)| target.map(|t| Link::new(relation, t)))
    .collect()
}

// ─── Record trait ────────────────────────────────────────────────────────────

/// A stored entity.
///
/// `id`, `created_at` and `updated_at` are always assigned by the store;
/// callers only ever provide a `New` or a `Patch`.
pub trait Record:
  Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
  const KIND: RecordKind;

  /// Input accepted by `ComplianceStore::add`.
  type New: Send + 'static;
  /// Partial update accepted by `ComplianceStore::update`. Unset fields are
  /// left untouched.
  type Patch: Send + 'static;

  fn id(&self) -> Uuid;
  fn tenant_id(&self) -> Uuid;
  fn created_at(&self) -> DateTime<Utc>;

  /// Outgoing references; each must resolve to an existing record of
  /// [`Relation::target`] kind in the same tenant.
  fn links(&self) -> Vec<Link>;

  /// Build and validate a record from its input.
  fn create(input: Self::New, id: Uuid, now: DateTime<Utc>) -> Result<Self>;

  /// Merge `patch` into `self`, validate the result, and stamp `updated_at`.
  fn apply(&mut self, patch: Self::Patch, now: DateTime<Utc>) -> Result<()>;
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// Parameters for `ComplianceStore::list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
  pub tenant_id: Option<Uuid>,
  /// Only records holding this link.
  pub link:      Option<Link>,
}

impl RecordFilter {
  pub fn tenant(tenant_id: Uuid) -> Self {
    Self { tenant_id: Some(tenant_id), link: None }
  }

  pub fn related(relation: Relation, target: Uuid) -> Self {
    Self { tenant_id: None, link: Some(Link::new(relation, target)) }
  }

  pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
    self.tenant_id = Some(tenant_id);
    self
  }
}

/// Overwrite `slot` when the patch carries a value.
pub(crate) fn merge<T>(slot: &mut T, value: Option<T>) {
  if let Some(v) = value {
    *slot = v;
  }
}

/// Overwrite an optional `slot` when the patch carries a value.
pub(crate) fn merge_opt<T>(slot: &mut Option<T>, value: Option<T>) {
  if value.is_some() {
    *slot = value;
  }
}
