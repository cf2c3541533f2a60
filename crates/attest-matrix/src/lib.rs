//! Competency-matrix spreadsheet codec.
//!
//! Converts between spreadsheet rows (as produced by an xlsx-to-JSON step)
//! and [`attest_core::matrix`] types. Pure synchronous; no HTTP or database
//! dependencies.
//!
//! The third column holds the required areas in the form
//! `"<category label>: <code>, <code> | <category label>: <code>"`.
//!
//! # Quick start
//!
//! ```no_run
//! use attest_matrix::parse_areas;
//!
//! let areas = parse_areas("Энергобезопасность: Б.3, Г.1.1").unwrap();
//! println!("{} categories", areas.len());
//! ```

pub mod error;
mod parse;
mod serialize;

use attest_core::{
  matrix::{AreaRequirement, CompetencyMatrix, NewCompetencyMatrix},
  organization::{Organization, Position},
};
pub use error::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Public types ────────────────────────────────────────────────────────────

/// One spreadsheet row, keyed by the column headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRow {
  #[serde(rename = "Организация", default)]
  pub organization:   String,
  #[serde(rename = "Должность", default)]
  pub position:       String,
  #[serde(rename = "Требуемые области аттестации", default)]
  pub required_areas: String,
  /// Present on export only.
  #[serde(
    rename = "Дата создания",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub created:        Option<String>,
  #[serde(
    rename = "Дата обновления",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub updated:        Option<String>,
}

impl MatrixRow {
  pub const ORGANIZATION: &'static str = "Организация";
  pub const POSITION: &'static str = "Должность";
  pub const REQUIRED_AREAS: &'static str = "Требуемые области аттестации";

  pub fn new(organization: &str, position: &str, required_areas: &str) -> Self {
    Self {
      organization: organization.to_owned(),
      position: position.to_owned(),
      required_areas: required_areas.to_owned(),
      created: None,
      updated: None,
    }
  }
}

/// A row left out of an import. `row` is the 1-based spreadsheet row,
/// counting the header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
  pub row:    usize,
  pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
  pub matrices: Vec<NewCompetencyMatrix>,
  pub skipped:  Vec<SkippedRow>,
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Parse a required-areas cell. Groups with an unknown category label or no
/// `label: codes` shape are skipped; a cell with no usable group is an
/// error.
pub fn parse_areas(cell: &str) -> Result<Vec<AreaRequirement>> {
  parse::parse_areas(cell)
}

/// Render requirements in the cell grammar accepted by [`parse_areas`].
pub fn format_areas(requirements: &[AreaRequirement]) -> String {
  serialize::format_areas(requirements)
}

/// Turn spreadsheet rows into matrix inputs for `tenant_id`.
///
/// Organisations and positions are resolved by exact name within the tenant.
/// Rows that cannot be resolved or parsed are reported in
/// [`ImportOutcome::skipped`]; if no row survives the import fails with
/// [`Error::NothingImported`].
pub fn import_rows(
  tenant_id: Uuid,
  rows: &[MatrixRow],
  organizations: &[Organization],
  positions: &[Position],
) -> Result<ImportOutcome> {
  parse::import_rows(tenant_id, rows, organizations, positions)
}

/// Render matrices as spreadsheet rows, including creation and update dates.
/// Matrices whose organisation or position is not in the given slices are
/// left out.
pub fn export_rows(
  matrices: &[CompetencyMatrix],
  organizations: &[Organization],
  positions: &[Position],
) -> Vec<MatrixRow> {
  serialize::export_rows(matrices, organizations, positions)
}

// ─── Round-trip test ─────────────────────────────────────────────────────────
