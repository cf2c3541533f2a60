//! Attestation orders and their status workflow.
//!
//! An order schedules a group of personnel for attestation in one area. Its
//! status only moves along the edges of [`OrderStatus::can_transition_to`];
//! ordinary patches never touch it.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  competency::AreaCode,
  error::require,
  record::{Link, Record, RecordKind, Relation, merge, merge_opt},
};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
  #[default]
  Draft,
  Pending,
  Scheduled,
  Completed,
  Cancelled,
}

impl OrderStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Cancelled)
  }

  /// Whether the personnel list may still change.
  pub fn is_open(self) -> bool { matches!(self, Self::Draft | Self::Pending) }

  pub fn can_transition_to(self, to: Self) -> bool {
    use OrderStatus::*;
    matches!(
      (self, to),
      (Draft, Pending)
        | (Draft, Cancelled)
        | (Pending, Scheduled)
        | (Pending, Cancelled)
        | (Scheduled, Completed)
        | (Scheduled, Cancelled)
    )
  }

  pub fn transition(self, to: Self) -> Result<Self> {
    if self.can_transition_to(to) {
      Ok(to)
    } else {
      Err(Error::IllegalTransition { from: self, to })
    }
  }
}

// ─── Documents and participants ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
  /// Attestation before the federal regulator.
  Regulator,
  InternalCommission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
  TrainingCertificate,
  MedicalCertificate,
  Diploma,
  WorkExperience,
  Other,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
  #[default]
  Missing,
  Attached,
  Verified,
}

/// A document a participant must provide before attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredDocument {
  #[serde(rename = "type")]
  pub doc_type:       DocumentType,
  pub name:           String,
  #[serde(default)]
  pub certificate_id: Option<Uuid>,
  #[serde(default)]
  pub file_url:       Option<String>,
  #[serde(default)]
  pub status:         DocumentStatus,
}

/// One participant of an order. Name and position are captured when the
/// participant is added, so the order reads the same after later edits to
/// the person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPersonnel {
  pub personnel_id:       Uuid,
  pub full_name:          String,
  pub position:           String,
  #[serde(default)]
  pub required_documents: Vec<RequiredDocument>,
}

// ─── Order ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationOrder {
  pub id:                 Uuid,
  pub tenant_id:          Uuid,
  pub organization_id:    Uuid,
  pub order_number:       String,
  pub order_date:         NaiveDate,
  pub kind:               OrderKind,
  pub area:               AreaCode,
  pub area_name:          String,
  pub personnel:          Vec<OrderPersonnel>,
  pub scheduled_date:     Option<NaiveDate>,
  pub commission_members: Vec<String>,
  pub location:           Option<String>,
  pub status:             OrderStatus,
  pub notes:              Option<String>,
  pub created_by:         Option<String>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAttestationOrder {
  pub tenant_id:          Uuid,
  pub organization_id:    Uuid,
  pub order_number:       String,
  pub order_date:         NaiveDate,
  pub kind:               OrderKind,
  pub area_name:          String,
  #[serde(default)]
  pub personnel:          Vec<OrderPersonnel>,
  #[serde(default)]
  pub scheduled_date:     Option<NaiveDate>,
  #[serde(default)]
  pub commission_members: Vec<String>,
  #[serde(default)]
  pub location:           Option<String>,
  #[serde(default)]
  pub notes:              Option<String>,
  #[serde(default)]
  pub created_by:         Option<String>,
}

/// Partial update for an order. Status changes go through
/// [`AttestationOrder::transition`] instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttestationOrderPatch {
  pub order_number:       Option<String>,
  pub order_date:         Option<NaiveDate>,
  pub kind:               Option<OrderKind>,
  pub area_name:          Option<String>,
  /// Replaces the whole participant list.
  pub personnel:          Option<Vec<OrderPersonnel>>,
  pub scheduled_date:     Option<NaiveDate>,
  pub commission_members: Option<Vec<String>>,
  pub location:           Option<String>,
  pub notes:              Option<String>,
}

impl AttestationOrder {
  /// Move the order to `to`, stamping `updated_at`.
  pub fn transition(
    &mut self,
    to: OrderStatus,
    now: DateTime<Utc>,
  ) -> Result<()> {
    let next = self.status.transition(to)?;
    if next == OrderStatus::Scheduled && self.scheduled_date.is_none() {
      return Err(Error::Validation(
        "scheduled_date is required before scheduling".into(),
      ));
    }
    self.status = next;
    self.updated_at = now;
    Ok(())
  }

  fn locked(&self) -> Error {
    Error::OrderLocked { id: self.id, status: self.status }
  }

  fn validate(&self) -> Result<()> {
    require("order_number", &self.order_number)?;
    let mut seen = HashSet::new();
    for p in &self.personnel {
      if !seen.insert(p.personnel_id) {
        return Err(Error::Validation(format!(
          "personnel {} listed twice",
          p.personnel_id
        )));
      }
    }
    Ok(())
  }
}

impl Record for AttestationOrder {
  const KIND: RecordKind = RecordKind::Order;
  type New = NewAttestationOrder;
  type Patch = AttestationOrderPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> {
    std::iter::once(Link::new(Relation::Organization, self.organization_id))
      .chain(
        self
          .personnel
          .iter()
          .map(|p| Link::new(Relation::Personnel, p.personnel_id)),
      )
      .collect()
  }

  fn create(
    input: NewAttestationOrder,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    let order = Self {
      id,
      tenant_id: input.tenant_id,
      organization_id: input.organization_id,
      order_number: input.order_number,
      order_date: input.order_date,
      kind: input.kind,
      area: AreaCode::parse(&input.area_name)?,
      area_name: input.area_name.trim().to_owned(),
      personnel: input.personnel,
      scheduled_date: input.scheduled_date,
      commission_members: input.commission_members,
      location: input.location,
      status: OrderStatus::Draft,
      notes: input.notes,
      created_by: input.created_by,
      created_at: now,
      updated_at: now,
    };
    order.validate()?;
    Ok(order)
  }

  fn apply(
    &mut self,
    patch: AttestationOrderPatch,
    now: DateTime<Utc>,
  ) -> Result<()> {
    if self.status.is_terminal()
      || (patch.personnel.is_some() && !self.status.is_open())
    {
      return Err(self.locked());
    }
    if let Some(name) = patch.area_name {
      self.area = AreaCode::parse(&name)?;
      self.area_name = name.trim().to_owned();
    }
    merge(&mut self.order_number, patch.order_number);
    merge(&mut self.order_date, patch.order_date);
    merge(&mut self.kind, patch.kind);
    merge(&mut self.personnel, patch.personnel);
    merge_opt(&mut self.scheduled_date, patch.scheduled_date);
    merge(&mut self.commission_members, patch.commission_members);
    merge_opt(&mut self.location, patch.location);
    merge_opt(&mut self.notes, patch.notes);
    self.validate()?;
    self.updated_at = now;
    Ok(())
  }
}
