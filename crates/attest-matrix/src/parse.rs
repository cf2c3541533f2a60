//! Matrix cell grammar and row import.
//!
//! Pipeline:
//!   MatrixRow
//!     └─ resolve organisation / position by exact name
//!          └─ parse_areas()   → Vec<AreaRequirement>
//!               └─ split_group() per `|`-separated group

use attest_core::{
  competency::{AreaCode, CertificationCategory},
  matrix::{AreaRequirement, NewCompetencyMatrix},
  organization::{Organization, Position},
};
use uuid::Uuid;

use crate::{
  ImportOutcome, MatrixRow, SkippedRow,
  error::{Error, Result},
};

// ─── Cell grammar ────────────────────────────────────────────────────────────

/// Split `"<label>: <codes>"` on the first colon. `None` when there is no
/// colon or either side is blank.
fn split_group(group: &str) -> Option<(&str, &str)> {
  let (label, codes) = group.split_once(':')?;
  let (label, codes) = (label.trim(), codes.trim());
  if label.is_empty() || codes.is_empty() {
    return None;
  }
  Some((label, codes))
}

fn parse_group(group: &str) -> Option<AreaRequirement> {
  let Some((label, codes)) = split_group(group) else {
    tracing::warn!(group, "malformed category group");
    return None;
  };
  let Some(category) = CertificationCategory::from_label(label) else {
    tracing::warn!(label, "unknown certification category");
    return None;
  };

  let areas = codes
    .split(',')
    .map(str::trim)
    .filter(|c| !c.is_empty())
    .filter_map(|c| AreaCode::parse(c).ok());
  AreaRequirement::new(category, areas).ok()
}

pub(crate) fn parse_areas(cell: &str) -> Result<Vec<AreaRequirement>> {
  let groups: Vec<_> = cell
    .split('|')
    .map(str::trim)
    .filter(|g| !g.is_empty())
    .filter_map(parse_group)
    .collect();
  if groups.is_empty() {
    return Err(Error::NoValidGroups(cell.to_owned()));
  }
  Ok(groups)
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// First data row; row 1 holds the column headers.
const FIRST_ROW: usize = 2;

fn non_blank<'a>(value: &'a str, column: &str) -> Result<&'a str, String> {
  let value = value.trim();
  if value.is_empty() {
    Err(format!("missing value in column {column:?}"))
  } else {
    Ok(value)
  }
}

fn import_row(
  tenant_id: Uuid,
  row: &MatrixRow,
  organizations: &[Organization],
  positions: &[Position],
) -> Result<NewCompetencyMatrix, String> {
  let org_name = non_blank(&row.organization, MatrixRow::ORGANIZATION)?;
  let position_name = non_blank(&row.position, MatrixRow::POSITION)?;
  let cell = non_blank(&row.required_areas, MatrixRow::REQUIRED_AREAS)?;

  let organization = organizations
    .iter()
    .find(|o| o.tenant_id == tenant_id && o.name == org_name)
    .ok_or_else(|| format!("unknown organization {org_name:?}"))?;
  let position = positions
    .iter()
    .find(|p| p.tenant_id == tenant_id && p.name == position_name)
    .ok_or_else(|| format!("unknown position {position_name:?}"))?;
  let required_areas = parse_areas(cell).map_err(|e| e.to_string())?;

  Ok(NewCompetencyMatrix {
    tenant_id,
    organization_id: organization.id,
    position_id: position.id,
    required_areas,
  })
}

pub(crate) fn import_rows(
  tenant_id: Uuid,
  rows: &[MatrixRow],
  organizations: &[Organization],
  positions: &[Position],
) -> Result<ImportOutcome> {
  let mut outcome = ImportOutcome::default();
  for (index, row) in rows.iter().enumerate() {
    match import_row(tenant_id, row, organizations, positions) {
      Ok(matrix) => outcome.matrices.push(matrix),
      Err(reason) => {
        let row = index + FIRST_ROW;
        tracing::warn!(row, %reason, "skipping matrix row");
        outcome.skipped.push(SkippedRow { row, reason });
      }
    }
  }

  if outcome.matrices.is_empty() {
    return Err(Error::NothingImported { skipped: outcome.skipped });
  }
  Ok(outcome)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn codes(req: &AreaRequirement) -> Vec<&str> {
    req.areas.iter().map(AreaCode::as_str).collect()
  }

  #[test]
  fn parses_multiple_groups() {
    let reqs = parse_areas(
      "Промышленная безопасность: А.1, Б.7 | Энергобезопасность: Г.1.1",
    )
    .unwrap();
    assert_eq!(reqs.len(), 2);
    assert_eq!(reqs[0].category, CertificationCategory::IndustrialSafety);
    assert_eq!(codes(&reqs[0]), ["А.1", "Б.7"]);
    assert_eq!(reqs[1].category, CertificationCategory::EnergySafety);
    assert_eq!(codes(&reqs[1]), ["Г.1.1"]);
  }

  #[test]
  fn codes_are_normalised() {
    let reqs =
      parse_areas("Энергобезопасность: Б.3 Эксплуатация объектов, , б.7")
        .unwrap();
    assert_eq!(codes(&reqs[0]), ["Б.3", "Б.7"]);
  }

  #[test]
  fn splits_on_first_colon_only() {
    let reqs = parse_areas("Охрана труда: Программа А: общие вопросы").unwrap();
    assert_eq!(codes(&reqs[0]), ["Программа А: общие вопросы"]);
  }

  #[test]
  fn unknown_and_malformed_groups_are_skipped() {
    let reqs = parse_areas(
      "Пожарная безопасность: П.1 | Экология | Экология: Э.1 | : А.1 | \
       промышленная безопасность: А.1",
    )
    .unwrap();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].category, CertificationCategory::Ecology);
  }

  #[test]
  fn cell_without_valid_groups_is_an_error() {
    assert!(matches!(
      parse_areas("Пожарная безопасность: П.1"),
      Err(Error::NoValidGroups(_))
    ));
    assert!(parse_areas(" | ").is_err());
  }

  #[test]
  fn split_group_rejects_blank_sides() {
    assert_eq!(split_group("Экология: Э.1"), Some(("Экология", "Э.1")));
    assert_eq!(split_group("Экология:  "), None);
    assert_eq!(split_group("Экология"), None);
  }
}
