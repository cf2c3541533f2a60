//! People and their employment relationships.
//!
//! A [`Person`] holds identity data only. [`Personnel`] links a person to an
//! organisation, department and position; one person may hold several
//! personnel records (e.g. an employee who also works for a contractor).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::require,
  organization::ActivityStatus,
  record::{Link, Record, RecordKind, Relation, links, merge, merge_opt},
};

// ─── Person ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
  Higher,
  Secondary,
  #[default]
  NoData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub id:              Uuid,
  pub tenant_id:       Uuid,
  pub last_name:       String,
  pub first_name:      String,
  pub middle_name:     Option<String>,
  pub birth_date:      Option<NaiveDate>,
  /// Insurance number (СНИЛС).
  pub snils:           Option<String>,
  pub inn:             Option<String>,
  pub email:           Option<String>,
  pub phone:           Option<String>,
  pub education_level: EducationLevel,
  pub status:          ActivityStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Person {
  /// `Фамилия Имя Отчество`, skipping an absent middle name.
  pub fn full_name(&self) -> String {
    let mut name = format!("{} {}", self.last_name, self.first_name);
    if let Some(middle) = self.middle_name.as_deref().filter(|m| !m.is_empty())
    {
      name.push(' ');
      name.push_str(middle);
    }
    name
  }

  fn validate(&self) -> Result<()> {
    require("last_name", &self.last_name)?;
    require("first_name", &self.first_name)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPerson {
  pub tenant_id:       Uuid,
  pub last_name:       String,
  pub first_name:      String,
  #[serde(default)]
  pub middle_name:     Option<String>,
  #[serde(default)]
  pub birth_date:      Option<NaiveDate>,
  #[serde(default)]
  pub snils:           Option<String>,
  #[serde(default)]
  pub inn:             Option<String>,
  #[serde(default)]
  pub email:           Option<String>,
  #[serde(default)]
  pub phone:           Option<String>,
  #[serde(default)]
  pub education_level: EducationLevel,
}

impl NewPerson {
  pub fn new(tenant_id: Uuid, last_name: &str, first_name: &str) -> Self {
    Self {
      tenant_id,
      last_name: last_name.to_owned(),
      first_name: first_name.to_owned(),
      middle_name: None,
      birth_date: None,
      snils: None,
      inn: None,
      email: None,
      phone: None,
      education_level: EducationLevel::default(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonPatch {
  pub last_name:       Option<String>,
  pub first_name:      Option<String>,
  pub middle_name:     Option<String>,
  pub birth_date:      Option<NaiveDate>,
  pub snils:           Option<String>,
  pub inn:             Option<String>,
  pub email:           Option<String>,
  pub phone:           Option<String>,
  pub education_level: Option<EducationLevel>,
  pub status:          Option<ActivityStatus>,
}

impl Record for Person {
  const KIND: RecordKind = RecordKind::Person;
  type New = NewPerson;
  type Patch = PersonPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> { Vec::new() }

  fn create(input: NewPerson, id: Uuid, now: DateTime<Utc>) -> Result<Self> {
    let person = Self {
      id,
      tenant_id: input.tenant_id,
      last_name: input.last_name,
      first_name: input.first_name,
      middle_name: input.middle_name,
      birth_date: input.birth_date,
      snils: input.snils,
      inn: input.inn,
      email: input.email,
      phone: input.phone,
      education_level: input.education_level,
      status: ActivityStatus::Active,
      created_at: now,
      updated_at: now,
    };
    person.validate()?;
    Ok(person)
  }

  fn apply(&mut self, patch: PersonPatch, now: DateTime<Utc>) -> Result<()> {
    merge(&mut self.last_name, patch.last_name);
    merge(&mut self.first_name, patch.first_name);
    merge_opt(&mut self.middle_name, patch.middle_name);
    merge_opt(&mut self.birth_date, patch.birth_date);
    merge_opt(&mut self.snils, patch.snils);
    merge_opt(&mut self.inn, patch.inn);
    merge_opt(&mut self.email, patch.email);
    merge_opt(&mut self.phone, patch.phone);
    merge(&mut self.education_level, patch.education_level);
    merge(&mut self.status, patch.status);
    self.validate()?;
    self.updated_at = now;
    Ok(())
  }
}

// ─── Personnel ───────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PersonnelType {
  #[default]
  Employee,
  Contractor,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PersonnelRole {
  Auditor,
  #[default]
  Manager,
  Director,
  Contractor,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PersonnelStatus {
  #[default]
  Active,
  Dismissed,
}

/// The employment or contract relationship between a person and an
/// organisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personnel {
  pub id:                    Uuid,
  pub tenant_id:             Uuid,
  pub person_id:             Uuid,
  pub position_id:           Uuid,
  pub organization_id:       Option<Uuid>,
  pub department_id:         Option<Uuid>,
  pub personnel_type:        PersonnelType,
  pub role:                  PersonnelRole,
  /// Competency ids assigned individually, on top of the position's matrix.
  pub required_competencies: Vec<Uuid>,
  pub status:                PersonnelStatus,
  pub hire_date:             Option<NaiveDate>,
  pub dismissal_date:        Option<NaiveDate>,
  pub created_at:            DateTime<Utc>,
  pub updated_at:            DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPersonnel {
  pub tenant_id:             Uuid,
  pub person_id:             Uuid,
  pub position_id:           Uuid,
  #[serde(default)]
  pub organization_id:       Option<Uuid>,
  #[serde(default)]
  pub department_id:         Option<Uuid>,
  #[serde(default)]
  pub personnel_type:        PersonnelType,
  #[serde(default)]
  pub role:                  PersonnelRole,
  #[serde(default)]
  pub required_competencies: Vec<Uuid>,
  #[serde(default)]
  pub hire_date:             Option<NaiveDate>,
}

impl NewPersonnel {
  pub fn new(
    tenant_id: Uuid,
    person_id: Uuid,
    position_id: Uuid,
    organization_id: Option<Uuid>,
  ) -> Self {
    Self {
      tenant_id,
      person_id,
      position_id,
      organization_id,
      department_id: None,
      personnel_type: PersonnelType::default(),
      role: PersonnelRole::default(),
      required_competencies: Vec::new(),
      hire_date: None,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonnelPatch {
  pub position_id:           Option<Uuid>,
  pub organization_id:       Option<Uuid>,
  pub department_id:         Option<Uuid>,
  pub personnel_type:        Option<PersonnelType>,
  pub role:                  Option<PersonnelRole>,
  pub required_competencies: Option<Vec<Uuid>>,
  pub status:                Option<PersonnelStatus>,
  pub hire_date:             Option<NaiveDate>,
  pub dismissal_date:        Option<NaiveDate>,
}

impl Personnel {
  pub fn is_active(&self) -> bool { self.status == PersonnelStatus::Active }

  fn validate(&self) -> Result<()> {
    if self.department_id.is_some() && self.organization_id.is_none() {
      return Err(Error::Validation(
        "department requires an organization".into(),
      ));
    }
    if let (Some(hired), Some(dismissed)) = (self.hire_date, self.dismissal_date)
    {
      if dismissed < hired {
        return Err(Error::Validation(
          "dismissal_date precedes hire_date".into(),
        ));
      }
    }
    Ok(())
  }
}

impl Record for Personnel {
  const KIND: RecordKind = RecordKind::Personnel;
  type New = NewPersonnel;
  type Patch = PersonnelPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> {
    let mut out = links([
      (Relation::Person, Some(self.person_id)),
      (Relation::Position, Some(self.position_id)),
      (Relation::Organization, self.organization_id),
      (Relation::Department, self.department_id),
    ]);
    out.extend(
      self
        .required_competencies
        .iter()
        .map(|id| Link::new(Relation::Competency, *id)),
    );
    out
  }

  fn create(input: NewPersonnel, id: Uuid, now: DateTime<Utc>) -> Result<Self> {
    let personnel = Self {
      id,
      tenant_id: input.tenant_id,
      person_id: input.person_id,
      position_id: input.position_id,
      organization_id: input.organization_id,
      department_id: input.department_id,
      personnel_type: input.personnel_type,
      role: input.role,
      required_competencies: input.required_competencies,
      status: PersonnelStatus::Active,
      hire_date: input.hire_date,
      dismissal_date: None,
      created_at: now,
      updated_at: now,
    };
    personnel.validate()?;
    Ok(personnel)
  }

  fn apply(&mut self, patch: PersonnelPatch, now: DateTime<Utc>) -> Result<()> {
    merge(&mut self.position_id, patch.position_id);
    merge_opt(&mut self.organization_id, patch.organization_id);
    merge_opt(&mut self.department_id, patch.department_id);
    merge(&mut self.personnel_type, patch.personnel_type);
    merge(&mut self.role, patch.role);
    merge(&mut self.required_competencies, patch.required_competencies);
    merge(&mut self.status, patch.status);
    merge_opt(&mut self.hire_date, patch.hire_date);
    merge_opt(&mut self.dismissal_date, patch.dismissal_date);
    self.validate()?;
    self.updated_at = now;
    Ok(())
  }
}
