//! Spreadsheet import and export for the competency matrix.
//!
//! Rows use the Russian column headers (`Организация`, `Должность`,
//! `Требуемые области аттестации`). Import is all-or-nothing at the store
//! level: either every surviving row is written or none is.

use attest_core::{
  RecordFilter,
  matrix::CompetencyMatrix,
  organization::{Organization, Position},
  store::{ComplianceStore, MatrixUpsert},
};
use attest_matrix::{MatrixRow, SkippedRow, export_rows, import_rows};
use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ImportBody {
  pub tenant_id: Uuid,
  pub rows:      Vec<MatrixRow>,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
  pub created: usize,
  pub updated: usize,
  pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
  pub tenant_id: Uuid,
}

async fn directory<S>(
  store: &S,
  tenant_id: Uuid,
) -> Result<(Vec<Organization>, Vec<Position>), ApiError>
where
  S: ComplianceStore,
{
  let organizations = store
    .list::<Organization>(RecordFilter::tenant(tenant_id))
    .await
    .map_err(ApiError::from_store)?;
  let positions = store
    .list::<Position>(RecordFilter::tenant(tenant_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok((organizations, positions))
}

/// `POST /matrices/import`
pub async fn import<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<ImportBody>,
) -> Result<Json<ImportReport>, ApiError>
where
  S: ComplianceStore,
{
  let (organizations, positions) =
    directory(state.store.as_ref(), body.tenant_id).await?;
  let outcome =
    import_rows(body.tenant_id, &body.rows, &organizations, &positions)?;

  let MatrixUpsert { created, updated } = state
    .store
    .upsert_matrices(body.tenant_id, outcome.matrices)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(
    tenant = %body.tenant_id,
    created,
    updated,
    skipped = outcome.skipped.len(),
    "imported competency matrix"
  );
  Ok(Json(ImportReport { created, updated, skipped: outcome.skipped }))
}

/// `GET /matrices/export?tenant_id=...`
pub async fn export<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ExportParams>,
) -> Result<Json<Vec<MatrixRow>>, ApiError>
where
  S: ComplianceStore,
{
  let (organizations, positions) =
    directory(state.store.as_ref(), params.tenant_id).await?;
  let matrices = state
    .store
    .list::<CompetencyMatrix>(RecordFilter::tenant(params.tenant_id))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(export_rows(&matrices, &organizations, &positions)))
}
