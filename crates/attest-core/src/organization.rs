//! Tenants and the organisational structure beneath them: organisations,
//! their departments and facilities, and the position directory.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::require,
  record::{Link, Record, RecordKind, Relation, links, merge, merge_opt},
};

/// Whether a directory entry is in use.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
  #[default]
  Active,
  Inactive,
}

// ─── Tenant ──────────────────────────────────────────────────────────────────

/// The top-level isolation boundary. A tenant's `tenant_id` is its own id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
  pub id:          Uuid,
  pub name:        String,
  pub inn:         String,
  pub admin_name:  String,
  pub admin_email: String,
  pub status:      ActivityStatus,
  /// End of the subscription, if any.
  pub expires_at:  Option<NaiveDate>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
  pub name:        String,
  pub inn:         String,
  pub admin_name:  String,
  pub admin_email: String,
  #[serde(default)]
  pub expires_at:  Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantPatch {
  pub name:        Option<String>,
  pub inn:         Option<String>,
  pub admin_name:  Option<String>,
  pub admin_email: Option<String>,
  pub status:      Option<ActivityStatus>,
  pub expires_at:  Option<NaiveDate>,
}

impl Tenant {
  fn validate(&self) -> Result<()> {
    require("name", &self.name)?;
    require("inn", &self.inn)?;
    require("admin_email", &self.admin_email)
  }
}

impl Record for Tenant {
  const KIND: RecordKind = RecordKind::Tenant;
  type New = NewTenant;
  type Patch = TenantPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> { Vec::new() }

  fn create(input: NewTenant, id: Uuid, now: DateTime<Utc>) -> Result<Self> {
    let tenant = Self {
      id,
      name: input.name,
      inn: input.inn,
      admin_name: input.admin_name,
      admin_email: input.admin_email,
      status: ActivityStatus::Active,
      expires_at: input.expires_at,
      created_at: now,
      updated_at: now,
    };
    tenant.validate()?;
    Ok(tenant)
  }

  fn apply(&mut self, patch: TenantPatch, now: DateTime<Utc>) -> Result<()> {
    merge(&mut self.name, patch.name);
    merge(&mut self.inn, patch.inn);
    merge(&mut self.admin_name, patch.admin_name);
    merge(&mut self.admin_email, patch.admin_email);
    merge(&mut self.status, patch.status);
    merge_opt(&mut self.expires_at, patch.expires_at);
    self.validate()?;
    self.updated_at = now;
    Ok(())
  }
}

// ─── Organization ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
  pub id:         Uuid,
  pub tenant_id:  Uuid,
  pub name:       String,
  pub inn:        String,
  pub kpp:        Option<String>,
  pub address:    Option<String>,
  pub status:     ActivityStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
  pub tenant_id: Uuid,
  pub name:      String,
  pub inn:       String,
  #[serde(default)]
  pub kpp:       Option<String>,
  #[serde(default)]
  pub address:   Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationPatch {
  pub name:    Option<String>,
  pub inn:     Option<String>,
  pub kpp:     Option<String>,
  pub address: Option<String>,
  pub status:  Option<ActivityStatus>,
}

impl Record for Organization {
  const KIND: RecordKind = RecordKind::Organization;
  type New = NewOrganization;
  type Patch = OrganizationPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> { Vec::new() }

  fn create(
    input: NewOrganization,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    require("name", &input.name)?;
    require("inn", &input.inn)?;
    Ok(Self {
      id,
      tenant_id: input.tenant_id,
      name: input.name,
      inn: input.inn,
      kpp: input.kpp,
      address: input.address,
      status: ActivityStatus::Active,
      created_at: now,
      updated_at: now,
    })
  }

  fn apply(
    &mut self,
    patch: OrganizationPatch,
    now: DateTime<Utc>,
  ) -> Result<()> {
    merge(&mut self.name, patch.name);
    merge(&mut self.inn, patch.inn);
    merge_opt(&mut self.kpp, patch.kpp);
    merge_opt(&mut self.address, patch.address);
    merge(&mut self.status, patch.status);
    require("name", &self.name)?;
    require("inn", &self.inn)?;
    self.updated_at = now;
    Ok(())
  }
}

// ─── Department ──────────────────────────────────────────────────────────────

/// A unit inside an organisation; departments may nest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
  pub id:              Uuid,
  pub tenant_id:       Uuid,
  pub organization_id: Uuid,
  pub parent_id:       Option<Uuid>,
  pub name:            String,
  pub code:            Option<String>,
  /// Free-text name of the department head.
  pub head:            Option<String>,
  pub status:          ActivityStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDepartment {
  pub tenant_id:       Uuid,
  pub organization_id: Uuid,
  #[serde(default)]
  pub parent_id:       Option<Uuid>,
  pub name:            String,
  #[serde(default)]
  pub code:            Option<String>,
  #[serde(default)]
  pub head:            Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentPatch {
  pub parent_id: Option<Uuid>,
  pub name:      Option<String>,
  pub code:      Option<String>,
  pub head:      Option<String>,
  pub status:    Option<ActivityStatus>,
}

impl Department {
  fn validate(&self) -> Result<()> {
    require("name", &self.name)?;
    if self.parent_id == Some(self.id) {
      return Err(Error::Validation(
        "a department cannot be its own parent".into(),
      ));
    }
    Ok(())
  }
}

impl Record for Department {
  const KIND: RecordKind = RecordKind::Department;
  type New = NewDepartment;
  type Patch = DepartmentPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> {
    links([
      (Relation::Organization, Some(self.organization_id)),
      (Relation::ParentDepartment, self.parent_id),
    ])
  }

  fn create(
    input: NewDepartment,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    let department = Self {
      id,
      tenant_id: input.tenant_id,
      organization_id: input.organization_id,
      parent_id: input.parent_id,
      name: input.name,
      code: input.code,
      head: input.head,
      status: ActivityStatus::Active,
      created_at: now,
      updated_at: now,
    };
    department.validate()?;
    Ok(department)
  }

  fn apply(
    &mut self,
    patch: DepartmentPatch,
    now: DateTime<Utc>,
  ) -> Result<()> {
    merge_opt(&mut self.parent_id, patch.parent_id);
    merge(&mut self.name, patch.name);
    merge_opt(&mut self.code, patch.code);
    merge_opt(&mut self.head, patch.head);
    merge(&mut self.status, patch.status);
    self.validate()?;
    self.updated_at = now;
    Ok(())
  }
}

// ─── Facility ────────────────────────────────────────────────────────────────

/// Hazardous production facility (ОПО) or gas transmission system (ГТС).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
  #[default]
  Opo,
  Gts,
}

/// Hazard class of a registered facility, I being the most dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardClass {
  I,
  II,
  III,
  IV,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FacilityStatus {
  #[default]
  Active,
  Inactive,
  Maintenance,
}

/// A site operated by an organisation. Facilities may nest, e.g. a
/// compressor station inside a pipeline system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
  pub id:                  Uuid,
  pub tenant_id:           Uuid,
  pub organization_id:     Uuid,
  pub parent_id:           Option<Uuid>,
  pub name:                String,
  /// State register number.
  pub registration_number: Option<String>,
  #[serde(rename = "type")]
  pub facility_type:       FacilityType,
  pub hazard_class:        Option<HazardClass>,
  pub address:             Option<String>,
  pub responsible:         Option<String>,
  pub status:              FacilityStatus,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFacility {
  pub tenant_id:           Uuid,
  pub organization_id:     Uuid,
  #[serde(default)]
  pub parent_id:           Option<Uuid>,
  pub name:                String,
  #[serde(default)]
  pub registration_number: Option<String>,
  #[serde(rename = "type", default)]
  pub facility_type:       FacilityType,
  #[serde(default)]
  pub hazard_class:        Option<HazardClass>,
  #[serde(default)]
  pub address:             Option<String>,
  #[serde(default)]
  pub responsible:         Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityPatch {
  pub parent_id:           Option<Uuid>,
  pub name:                Option<String>,
  pub registration_number: Option<String>,
  #[serde(rename = "type")]
  pub facility_type:       Option<FacilityType>,
  pub hazard_class:        Option<HazardClass>,
  pub address:             Option<String>,
  pub responsible:         Option<String>,
  pub status:              Option<FacilityStatus>,
}

impl Facility {
  fn validate(&self) -> Result<()> {
    require("name", &self.name)?;
    if self.parent_id == Some(self.id) {
      return Err(Error::Validation(
        "a facility cannot be its own parent".into(),
      ));
    }
    Ok(())
  }
}

impl Record for Facility {
  const KIND: RecordKind = RecordKind::Facility;
  type New = NewFacility;
  type Patch = FacilityPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> {
    links([
      (Relation::Organization, Some(self.organization_id)),
      (Relation::ParentFacility, self.parent_id),
    ])
  }

  fn create(input: NewFacility, id: Uuid, now: DateTime<Utc>) -> Result<Self> {
    let facility = Self {
      id,
      tenant_id: input.tenant_id,
      organization_id: input.organization_id,
      parent_id: input.parent_id,
      name: input.name,
      registration_number: input.registration_number,
      facility_type: input.facility_type,
      hazard_class: input.hazard_class,
      address: input.address,
      responsible: input.responsible,
      status: FacilityStatus::Active,
      created_at: now,
      updated_at: now,
    };
    facility.validate()?;
    Ok(facility)
  }

  fn apply(&mut self, patch: FacilityPatch, now: DateTime<Utc>) -> Result<()> {
    merge_opt(&mut self.parent_id, patch.parent_id);
    merge(&mut self.name, patch.name);
    merge_opt(&mut self.registration_number, patch.registration_number);
    merge(&mut self.facility_type, patch.facility_type);
    merge_opt(&mut self.hazard_class, patch.hazard_class);
    merge_opt(&mut self.address, patch.address);
    merge_opt(&mut self.responsible, patch.responsible);
    merge(&mut self.status, patch.status);
    self.validate()?;
    self.updated_at = now;
    Ok(())
  }
}

// ─── Position ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PositionCategory {
  Management,
  Specialist,
  Worker,
  #[default]
  Other,
}

/// An entry in the tenant's position directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
  pub id:          Uuid,
  pub tenant_id:   Uuid,
  pub name:        String,
  pub code:        Option<String>,
  pub category:    PositionCategory,
  pub description: Option<String>,
  pub status:      ActivityStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPosition {
  pub tenant_id:   Uuid,
  pub name:        String,
  #[serde(default)]
  pub code:        Option<String>,
  #[serde(default)]
  pub category:    PositionCategory,
  #[serde(default)]
  pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionPatch {
  pub name:        Option<String>,
  pub code:        Option<String>,
  pub category:    Option<PositionCategory>,
  pub description: Option<String>,
  pub status:      Option<ActivityStatus>,
}

impl Record for Position {
  const KIND: RecordKind = RecordKind::Position;
  type New = NewPosition;
  type Patch = PositionPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> { Vec::new() }

  fn create(input: NewPosition, id: Uuid, now: DateTime<Utc>) -> Result<Self> {
    require("name", &input.name)?;
    Ok(Self {
      id,
      tenant_id: input.tenant_id,
      name: input.name.trim().to_owned(),
      code: input.code,
      category: input.category,
      description: input.description,
      status: ActivityStatus::Active,
      created_at: now,
      updated_at: now,
    })
  }

  fn apply(&mut self, patch: PositionPatch, now: DateTime<Utc>) -> Result<()> {
    merge(&mut self.name, patch.name.map(|n| n.trim().to_owned()));
    merge_opt(&mut self.code, patch.code);
    merge(&mut self.category, patch.category);
    merge_opt(&mut self.description, patch.description);
    merge(&mut self.status, patch.status);
    require("name", &self.name)?;
    self.updated_at = now;
    Ok(())
  }
}
