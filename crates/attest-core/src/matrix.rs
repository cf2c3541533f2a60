//! The competency matrix: which certification areas a position requires
//! within an organisation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  competency::{AreaCode, CertificationCategory},
  record::{Link, Record, RecordKind, Relation, links, merge},
};

/// The areas required within one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRequirement {
  pub category: CertificationCategory,
  pub areas:    Vec<AreaCode>,
}

/// Separators of the spreadsheet cell grammar. Area codes may not contain
/// them.
const CELL_SEPARATORS: [char; 2] = [',', '|'];

impl AreaRequirement {
  /// Build a requirement, dropping repeated codes while keeping first-seen
  /// order. At least one area is required, and no code may contain a cell
  /// separator.
  pub fn new(
    category: CertificationCategory,
    areas: impl IntoIterator<Item = AreaCode>,
  ) -> Result<Self> {
    let mut unique: Vec<AreaCode> = Vec::new();
    for code in areas {
      if code.as_str().contains(CELL_SEPARATORS) {
        return Err(Error::Validation(format!(
          "area code \"{code}\" contains a list separator (',' or '|')"
        )));
      }
      if !unique.contains(&code) {
        unique.push(code);
      }
    }
    if unique.is_empty() {
      return Err(Error::Validation(format!(
        "no areas listed for {}",
        category.label()
      )));
    }
    Ok(Self { category, areas: unique })
  }
}

/// Normalise a requirement list: one entry per category in first-seen order,
/// repeated codes removed.
fn normalise(requirements: Vec<AreaRequirement>) -> Result<Vec<AreaRequirement>> {
  let mut merged: Vec<AreaRequirement> = Vec::new();
  for req in requirements {
    match merged.iter_mut().find(|m| m.category == req.category) {
      Some(existing) => existing.areas.extend(req.areas),
      None => merged.push(req),
    }
  }
  if merged.is_empty() {
    return Err(Error::Validation("matrix has no required areas".into()));
  }
  merged
    .into_iter()
    .map(|r| AreaRequirement::new(r.category, r.areas))
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetencyMatrix {
  pub id:              Uuid,
  pub tenant_id:       Uuid,
  pub organization_id: Uuid,
  pub position_id:     Uuid,
  pub required_areas:  Vec<AreaRequirement>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl CompetencyMatrix {
  /// Every `(category, code)` pair the matrix requires, in order.
  pub fn required_codes(
    &self,
  ) -> impl Iterator<Item = (CertificationCategory, &AreaCode)> + '_ {
    self
      .required_areas
      .iter()
      .flat_map(|r| r.areas.iter().map(move |code| (r.category, code)))
  }

  pub fn applies_to(&self, organization_id: Uuid, position_id: Uuid) -> bool {
    self.organization_id == organization_id && self.position_id == position_id
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompetencyMatrix {
  pub tenant_id:       Uuid,
  pub organization_id: Uuid,
  pub position_id:     Uuid,
  pub required_areas:  Vec<AreaRequirement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetencyMatrixPatch {
  pub required_areas: Option<Vec<AreaRequirement>>,
}

impl Record for CompetencyMatrix {
  const KIND: RecordKind = RecordKind::Matrix;
  type New = NewCompetencyMatrix;
  type Patch = CompetencyMatrixPatch;

  fn id(&self) -> Uuid { self.id }

  fn tenant_id(&self) -> Uuid { self.tenant_id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }

  fn links(&self) -> Vec<Link> {
    links([
      (Relation::Organization, Some(self.organization_id)),
      (Relation::Position, Some(self.position_id)),
    ])
  }

  fn create(
    input: NewCompetencyMatrix,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    Ok(Self {
      id,
      tenant_id: input.tenant_id,
      organization_id: input.organization_id,
      position_id: input.position_id,
      required_areas: normalise(input.required_areas)?,
      created_at: now,
      updated_at: now,
    })
  }

  fn apply(
    &mut self,
    patch: CompetencyMatrixPatch,
    now: DateTime<Utc>,
  ) -> Result<()> {
    merge(
      &mut self.required_areas,
      patch.required_areas.map(normalise).transpose()?,
    );
    self.updated_at = now;
    Ok(())
  }
}
