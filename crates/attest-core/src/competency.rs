//! Certification categories, normalised area codes, and the competency
//! directory.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::require,
  organization::ActivityStatus,
  record::{Link, Record, RecordKind, merge, merge_opt},
};

// ─── Category ────────────────────────────────────────────────────────────────

/// The regulatory domain a certification belongs to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CertificationCategory {
  IndustrialSafety,
  EnergySafety,
  LaborSafety,
  Ecology,
}

impl CertificationCategory {
  /// Human-readable label used in spreadsheets and reports.
  pub fn label(self) -> &'static str {
    match self {
      Self::IndustrialSafety => "Промышленная безопасность",
      Self::EnergySafety => "Энергобезопасность",
      Self::LaborSafety => "Охрана труда",
      Self::Ecology => "Экология",
    }
  }

  /// Short abbreviation (ПБ, ЭБ, ОТ, ЭК).
  pub fn abbreviation(self) -> &'static str {
    match self {
      Self::IndustrialSafety => "ПБ",
      Self::EnergySafety => "ЭБ",
      Self::LaborSafety => "ОТ",
      Self::Ecology => "ЭК",
    }
  }

  /// Exact, case-sensitive lookup by [`label`](Self::label).
  pub fn from_label(label: &str) -> Option<Self> {
    Self::iter().find(|c| c.label() == label)
  }
}

// ─── AreaCode ────────────────────────────────────────────────────────────────

/// A normalised certification-area code.
///
/// Area labels such as `"Б.3 Эксплуатация объектов электроэнергетики"` reduce
/// to their leading code (`Б.3`). Labels without a leading code (`"III группа
/// до 1000В"`) keep the whole label, with whitespace collapsed. Requirements
/// and certifications are matched by equality on this type.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct AreaCode(String);

impl AreaCode {
  pub fn parse(label: &str) -> Result<Self> {
    let collapsed = label.split_whitespace().collect::<Vec<_>>().join(" ");
    let Some(first) = collapsed.split(' ').next().filter(|t| !t.is_empty())
    else {
      return Err(Error::EmptyAreaCode);
    };

    let token = first.trim_end_matches('.');
    if looks_like_code(token) {
      Ok(Self(token.to_uppercase()))
    } else {
      Ok(Self(collapsed))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// `Б.3`, `А.1`, `ЭБ.1`, `Г.2.1`: a short alphabetic prefix followed by one
/// or more dot-separated digit groups.
fn looks_like_code(token: &str) -> bool {
  let mut parts = token.split('.');
  let prefix = parts.next().unwrap_or_default();
  let prefix_len = prefix.chars().count();
  if prefix_len == 0 || prefix_len > 4 || !prefix.chars().all(char::is_alphabetic)
  {
    return false;
  }

  let mut groups = 0;
  for part in parts {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
      return false;
    }
    groups += 1;
  }
  groups > 0
}

impl fmt::Display for AreaCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for AreaCode {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<AreaCode> for String {
  fn from(code: AreaCode) -> Self { code.0 }
}

// ─── Competency ──────────────────────────────────────────────────────────────

/// A certifiable area in the tenant's competency directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competency {
  pub id:                 Uuid,
  pub tenant_id:          Uuid,
  pub code:               AreaCode,
  pub name:               String,
  pub category:           CertificationCategory,
  /// How long a certification in this area stays valid.
  pub validity_months:    u32,
  /// Whether attestation must go through the federal regulator rather than
  /// an internal commission.
  pub requires_regulator: bool,
  pub description:        Option<String>,
  pub status:             ActivityStatus,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompetency {
  pub tenant_id:          Uuid,
  pub code:               AreaCode,
  pub name:               String,
  pub category:           CertificationCategory,
  pub validity_months:    u32,
  #[serde(default)]
  pub requires_regulator: bool,
  #[serde(default)]
  pub description:        Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetencyPatch {
  pub code:               Option<AreaCode>,
  pub name:               Option<String>,
  pub category:           Option<CertificationCategory>,
  pub validity_months:    Option<u32>,
  pub requires_regulator: Option<bool>,
  pub description:        Option<String>,
  pub status:             Option<ActivityStatus>,
}

impl Competency {
  fn validate(&self) -> Result<()> {
    require("name", &self.name)?;
    if self.validity_months == 0 {
      return Err(Error::Validation(
        "validity_months must be positive".into(),
      ));
    }
    Ok(())
  }
}

impl Record for Competency {
  const KIND: RecordKind = RecordKind::Competency;
  type New = NewCompetency;
  type Patch = CompetencyPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> { Vec::new() }

  fn create(
    input: NewCompetency,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    let competency = Self {
      id,
      tenant_id: input.tenant_id,
      code: input.code,
      name: input.name,
      category: input.category,
      validity_months: input.validity_months,
      requires_regulator: input.requires_regulator,
      description: input.description,
      status: ActivityStatus::Active,
      created_at: now,
      updated_at: now,
    };
    competency.validate()?;
    Ok(competency)
  }

  fn apply(
    &mut self,
    patch: CompetencyPatch,
    now: DateTime<Utc>,
  ) -> Result<()> {
    merge(&mut self.code, patch.code);
    merge(&mut self.name, patch.name);
    merge(&mut self.category, patch.category);
    merge(&mut self.validity_months, patch.validity_months);
    merge(&mut self.requires_regulator, patch.requires_regulator);
    merge_opt(&mut self.description, patch.description);
    merge(&mut self.status, patch.status);
    self.validate()?;
    self.updated_at = now;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn code(s: &str) -> String { AreaCode::parse(s).unwrap().to_string() }

  #[test]
  fn leading_code_is_extracted_from_label() {
    assert_eq!(code("Б.3 Эксплуатация объектов электроэнергетики"), "Б.3");
    assert_eq!(code("А.1 Основы промышленной безопасности"), "А.1");
    assert_eq!(code("  Г.2.1   Эксплуатация "), "Г.2.1");
    assert_eq!(code("ЭБ.1"), "ЭБ.1");
  }

  #[test]
  fn lower_case_codes_are_upper_cased() {
    assert_eq!(code("б.7"), "Б.7");
  }

  #[test]
  fn trailing_dot_is_ignored() {
    assert_eq!(code("Б.1. Химия"), "Б.1");
  }

  #[test]
  fn labels_without_a_code_keep_collapsed_text() {
    assert_eq!(code("III группа   до 1000В"), "III группа до 1000В");
    assert_eq!(
      code("Охрана труда для руководителей и специалистов"),
      "Охрана труда для руководителей и специалистов"
    );
  }

  #[test]
  fn empty_label_is_rejected() {
    assert!(matches!(AreaCode::parse("   "), Err(Error::EmptyAreaCode)));
  }

  #[test]
  fn prefix_must_be_short_and_alphabetic() {
    assert_eq!(code("1.2 что-то"), "1.2 что-то");
    assert_eq!(code("Пример.1 текст"), "Пример.1 текст");
  }

  #[test]
  fn area_codes_deserialize_through_normalisation() {
    let parsed: AreaCode =
      serde_json::from_str("\"Б.3 Эксплуатация\"").unwrap();
    assert_eq!(parsed.as_str(), "Б.3");
    assert!(serde_json::from_str::<AreaCode>("\"\"").is_err());
  }

  #[test]
  fn category_labels_are_case_sensitive() {
    assert_eq!(
      CertificationCategory::from_label("Энергобезопасность"),
      Some(CertificationCategory::EnergySafety)
    );
    assert_eq!(CertificationCategory::from_label("энергобезопасность"), None);
  }

  #[test]
  fn competency_rejects_zero_validity() {
    let err = Competency::create(
      NewCompetency {
        tenant_id:          Uuid::new_v4(),
        code:               AreaCode::parse("Б.3").unwrap(),
        name:               "Эксплуатация объектов электроэнергетики".into(),
        category:           CertificationCategory::IndustrialSafety,
        validity_months:    0,
        requires_regulator: true,
        description:        None,
      },
      Uuid::new_v4(),
      Utc::now(),
    );
    assert!(matches!(err, Err(Error::Validation(_))));
  }
}
