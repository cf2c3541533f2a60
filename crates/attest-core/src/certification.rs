//! Certifications and the expiry classifier.
//!
//! A certification's status is never stored. It is derived on every read
//! from the expiry date, the current day, and an [`ExpiryPolicy`], so it can
//! not drift from the calendar.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  competency::{AreaCode, CertificationCategory},
  record::{Link, Record, RecordKind, Relation, links, merge, merge_opt},
};

// ─── Classifier ──────────────────────────────────────────────────────────────

/// Derived validity of a certification relative to a given day.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
  Active,
  ExpiringSoon,
  Expired,
}

/// The window in which a still-valid certification counts as expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPolicy {
  pub warning_days: u32,
}

impl ExpiryPolicy {
  pub const DEFAULT_WARNING_DAYS: u32 = 90;

  pub fn new(warning_days: u32) -> Self { Self { warning_days } }
}

impl Default for ExpiryPolicy {
  fn default() -> Self { Self::new(Self::DEFAULT_WARNING_DAYS) }
}

/// Classify an expiry date as seen on `today`.
///
/// - `expiry < today` is [`Expired`](CertificationStatus::Expired);
/// - `today <= expiry <= today + warning_days` is
///   [`ExpiringSoon`](CertificationStatus::ExpiringSoon);
/// - anything later is [`Active`](CertificationStatus::Active).
pub fn classify(
  expiry: NaiveDate,
  today: NaiveDate,
  policy: &ExpiryPolicy,
) -> CertificationStatus {
  if expiry < today {
    return CertificationStatus::Expired;
  }
  let horizon = today.checked_add_days(Days::new(policy.warning_days.into()));
  match horizon {
    Some(limit) if expiry > limit => CertificationStatus::Active,
    _ => CertificationStatus::ExpiringSoon,
  }
}

/// Signed number of days from `today` until `expiry`; negative once expired.
pub fn days_until_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
  (expiry - today).num_days()
}

/// Default expiry for a certification issued on `issue_date` in an area that
/// stays valid for `validity_months`. Days past the end of the target month
/// are clamped (31 Jan + 1 month = 28/29 Feb).
pub fn expires_on(issue_date: NaiveDate, validity_months: u32) -> Result<NaiveDate> {
  issue_date
    .checked_add_months(Months::new(validity_months))
    .ok_or_else(|| {
      Error::Validation(format!(
        "{issue_date} plus {validity_months} months is out of range"
      ))
    })
}

/// Parse a calendar date in ISO (`2024-10-20`) or Russian (`20.10.2024`)
/// notation.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
  let s = input.trim();
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(s, "%d.%m.%Y"))
    .map_err(|_| Error::InvalidDate(input.to_owned()))
}

// ─── Certification ───────────────────────────────────────────────────────────

/// Who carried out the attestation.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AttestationKind {
  /// The federal regulator (Rostechnadzor).
  Regulator,
  #[default]
  CompanyCommission,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AttestationResult {
  #[default]
  Passed,
  Failed,
}

/// A certification held by a person in one area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
  pub id:              Uuid,
  pub tenant_id:       Uuid,
  pub person_id:       Uuid,
  pub competency_id:   Option<Uuid>,
  pub category:        CertificationCategory,
  /// Normalised code of [`area_label`](Self::area_label).
  pub area:            AreaCode,
  pub area_label:      String,
  pub issue_date:      NaiveDate,
  pub expiry_date:     NaiveDate,
  pub protocol_number: Option<String>,
  pub issued_by:       Option<String>,
  pub kind:            AttestationKind,
  pub result:          AttestationResult,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCertification {
  pub tenant_id:       Uuid,
  pub person_id:       Uuid,
  #[serde(default)]
  pub competency_id:   Option<Uuid>,
  pub category:        CertificationCategory,
  pub area_label:      String,
  pub issue_date:      NaiveDate,
  /// When absent, the caller is expected to derive it with [`expires_on`]
  /// from the linked competency before the record is created.
  #[serde(default)]
  pub expiry_date:     Option<NaiveDate>,
  #[serde(default)]
  pub protocol_number: Option<String>,
  #[serde(default)]
  pub issued_by:       Option<String>,
  #[serde(default)]
  pub kind:            AttestationKind,
  #[serde(default)]
  pub result:          AttestationResult,
}

impl NewCertification {
  pub fn new(
    tenant_id: Uuid,
    person_id: Uuid,
    category: CertificationCategory,
    area_label: &str,
    issue_date: NaiveDate,
    expiry_date: NaiveDate,
  ) -> Self {
    Self {
      tenant_id,
      person_id,
      competency_id: None,
      category,
      area_label: area_label.to_owned(),
      issue_date,
      expiry_date: Some(expiry_date),
      protocol_number: None,
      issued_by: None,
      kind: AttestationKind::default(),
      result: AttestationResult::default(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificationPatch {
  pub competency_id:   Option<Uuid>,
  pub category:        Option<CertificationCategory>,
  pub area_label:      Option<String>,
  pub issue_date:      Option<NaiveDate>,
  pub expiry_date:     Option<NaiveDate>,
  pub protocol_number: Option<String>,
  pub issued_by:       Option<String>,
  pub kind:            Option<AttestationKind>,
  pub result:          Option<AttestationResult>,
}

impl Certification {
  pub fn status(
    &self,
    today: NaiveDate,
    policy: &ExpiryPolicy,
  ) -> CertificationStatus {
    classify(self.expiry_date, today, policy)
  }

  /// Whether this certification counts towards a requirement on `today`.
  pub fn is_valid_on(&self, today: NaiveDate) -> bool {
    self.result == AttestationResult::Passed && self.expiry_date >= today
  }

  /// Attach the derived status as seen on `today`.
  pub fn resolve(
    self,
    today: NaiveDate,
    policy: &ExpiryPolicy,
  ) -> ResolvedCertification {
    ResolvedCertification {
      status: self.status(today, policy),
      days_until_expiry: days_until_expiry(self.expiry_date, today),
      certification: self,
    }
  }

  fn validate(&self) -> Result<()> {
    if self.expiry_date < self.issue_date {
      return Err(Error::Validation(
        "expiry_date precedes issue_date".into(),
      ));
    }
    Ok(())
  }
}

impl Record for Certification {
  const KIND: RecordKind = RecordKind::Certification;
  type New = NewCertification;
  type Patch = CertificationPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> {
    links([
      (Relation::Person, Some(self.person_id)),
      (Relation::Competency, self.competency_id),
    ])
  }

  fn create(
    input: NewCertification,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    let expiry_date = input
      .expiry_date
      .ok_or_else(|| Error::Validation("expiry_date is required".into()))?;
    let cert = Self {
      id,
      tenant_id: input.tenant_id,
      person_id: input.person_id,
      competency_id: input.competency_id,
      category: input.category,
      area: AreaCode::parse(&input.area_label)?,
      area_label: input.area_label.trim().to_owned(),
      issue_date: input.issue_date,
      expiry_date,
      protocol_number: input.protocol_number,
      issued_by: input.issued_by,
      kind: input.kind,
      result: input.result,
      created_at: now,
      updated_at: now,
    };
    cert.validate()?;
    Ok(cert)
  }

  fn apply(
    &mut self,
    patch: CertificationPatch,
    now: DateTime<Utc>,
  ) -> Result<()> {
    if let Some(label) = patch.area_label {
      self.area = AreaCode::parse(&label)?;
      self.area_label = label.trim().to_owned();
    }
    merge_opt(&mut self.competency_id, patch.competency_id);
    merge(&mut self.category, patch.category);
    merge(&mut self.issue_date, patch.issue_date);
    merge(&mut self.expiry_date, patch.expiry_date);
    merge_opt(&mut self.protocol_number, patch.protocol_number);
    merge_opt(&mut self.issued_by, patch.issued_by);
    merge(&mut self.kind, patch.kind);
    merge(&mut self.result, patch.result);
    self.validate()?;
    self.updated_at = now;
    Ok(())
  }
}

/// A certification together with its status on a given day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCertification {
  #[serde(flatten)]
  pub certification:     Certification,
  pub status:            CertificationStatus,
  pub days_until_expiry: i64,
}
