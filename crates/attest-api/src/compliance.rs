//! Handlers for `/compliance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/compliance/personnel/{id}` | `?as_of` |
//! | `GET`  | `/compliance/report` | `?tenant_id` (required), `?as_of` |

use attest_core::{
  RecordFilter, Relation,
  certification::{Certification, ResolvedCertification},
  compliance::{
    AnalysisInput, CompetencyGapReport, PersonnelCompliance, analyze,
    analyze_personnel,
  },
  matrix::CompetencyMatrix,
  organization::Organization,
  person::{Person, Personnel},
  store::ComplianceStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, certifications::AsOf, error::ApiError, today};

/// `GET /compliance/personnel/{id}`
pub async fn personnel<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOf>,
) -> Result<Json<PersonnelCompliance>, ApiError>
where
  S: ComplianceStore,
{
  let store = &state.store;
  let personnel = store
    .get::<Personnel>(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("personnel {id} not found")))?;
  let person = store
    .get::<Person>(personnel.person_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("person {} not found", personnel.person_id))
    })?;

  let matrix = match personnel.organization_id {
    Some(org) => store
      .list::<CompetencyMatrix>(RecordFilter::related(
        Relation::Organization,
        org,
      ))
      .await
      .map_err(ApiError::from_store)?
      .into_iter()
      .find(|m| m.applies_to(org, personnel.position_id)),
    None => None,
  };

  let day = today(params.as_of);
  let held: Vec<ResolvedCertification> = store
    .list::<Certification>(RecordFilter::related(Relation::Person, person.id))
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|c| c.resolve(day, &state.policy))
    .collect();

  Ok(Json(analyze_personnel(
    &personnel,
    &person,
    matrix.as_ref(),
    &held,
  )))
}

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  pub tenant_id: Uuid,
  pub as_of:     Option<NaiveDate>,
}

/// `GET /compliance/report`
pub async fn report<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ReportParams>,
) -> Result<Json<CompetencyGapReport>, ApiError>
where
  S: ComplianceStore,
{
  let store = &state.store;
  let scope = || RecordFilter::tenant(params.tenant_id);

  let personnel = store
    .list::<Personnel>(scope())
    .await
    .map_err(ApiError::from_store)?;
  let people = store
    .list::<Person>(scope())
    .await
    .map_err(ApiError::from_store)?;
  let organizations = store
    .list::<Organization>(scope())
    .await
    .map_err(ApiError::from_store)?;
  let matrices = store
    .list::<CompetencyMatrix>(scope())
    .await
    .map_err(ApiError::from_store)?;

  let day = today(params.as_of);
  let certifications: Vec<ResolvedCertification> = store
    .list::<Certification>(scope())
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|c| c.resolve(day, &state.policy))
    .collect();

  let report = analyze(AnalysisInput {
    personnel:      &personnel,
    people:         &people,
    organizations:  &organizations,
    matrices:       &matrices,
    certifications: &certifications,
  });
  tracing::debug!(
    tenant = %params.tenant_id,
    total = report.total_personnel,
    compliant = report.compliant,
    "built compliance report"
  );
  Ok(Json(report))
}
