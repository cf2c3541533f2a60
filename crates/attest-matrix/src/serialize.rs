//! Matrix row export.

use attest_core::{
  matrix::{AreaRequirement, CompetencyMatrix},
  organization::{Organization, Position},
};
use chrono::{DateTime, Utc};

use crate::MatrixRow;

pub(crate) fn format_areas(requirements: &[AreaRequirement]) -> String {
  requirements
    .iter()
    .map(|r| {
      let codes: Vec<&str> = r.areas.iter().map(|c| c.as_str()).collect();
      format!("{}: {}", r.category.label(), codes.join(", "))
    })
    .collect::<Vec<_>>()
    .join(" | ")
}

fn format_date(at: DateTime<Utc>) -> String {
  at.date_naive().format("%d.%m.%Y").to_string()
}

pub(crate) fn export_rows(
  matrices: &[CompetencyMatrix],
  organizations: &[Organization],
  positions: &[Position],
) -> Vec<MatrixRow> {
  matrices
    .iter()
    .filter_map(|m| {
      let org = organizations.iter().find(|o| o.id == m.organization_id);
      let position = positions.iter().find(|p| p.id == m.position_id);
      let (Some(org), Some(position)) = (org, position) else {
        tracing::warn!(matrix = %m.id, "matrix references unknown records");
        return None;
      };
      Some(MatrixRow {
        organization:   org.name.clone(),
        position:       position.name.clone(),
        required_areas: format_areas(&m.required_areas),
        created:        Some(format_date(m.created_at)),
        updated:        Some(format_date(m.updated_at)),
      })
    })
    .collect()
}
