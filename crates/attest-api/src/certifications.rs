//! Handlers for `/certifications` endpoints.
//!
//! Certifications are always returned with their status derived for the
//! requested day (`?as_of=YYYY-MM-DD`, default today).
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/certifications` | `?tenant_id`, `?person_id` or `?competency_id`, `?status`, `?as_of` |
//! | `POST`   | `/certifications` | `expiry_date` may be omitted when `competency_id` is set |
//! | `GET`    | `/certifications/upcoming` | `?tenant_id`, `?within_days` (default: the warning window), `?as_of` |
//! | `GET`    | `/certifications/{id}` | 404 if not found |
//! | `PATCH`  | `/certifications/{id}` | |
//! | `DELETE` | `/certifications/{id}` | Same as the other collections |

use attest_core::{
  Relation,
  certification::{
    Certification, CertificationPatch, CertificationStatus,
    NewCertification, ResolvedCertification, expires_on,
  },
  competency::Competency,
  compliance,
  store::ComplianceStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError, records::build_filter, today};

/// `?as_of=` for single-record reads.
#[derive(Debug, Default, Deserialize)]
pub struct AsOf {
  pub as_of: Option<NaiveDate>,
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub tenant_id:     Option<Uuid>,
  pub person_id:     Option<Uuid>,
  pub competency_id: Option<Uuid>,
  pub status:        Option<CertificationStatus>,
  pub as_of:         Option<NaiveDate>,
}

/// `GET /certifications`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ResolvedCertification>>, ApiError>
where
  S: ComplianceStore,
{
  let filter = build_filter(params.tenant_id, [
    (Relation::Person, params.person_id),
    (Relation::Competency, params.competency_id),
  ])?;
  let day = today(params.as_of);

  let resolved = state
    .store
    .list::<Certification>(filter)
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|c| c.resolve(day, &state.policy))
    .filter(|c| params.status.is_none_or(|s| c.status == s))
    .collect();
  Ok(Json(resolved))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /certifications`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(mut input): Json<NewCertification>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ComplianceStore,
{
  if let (None, Some(competency_id)) = (input.expiry_date, input.competency_id)
  {
    let competency = state
      .store
      .get::<Competency>(competency_id)
      .await
      .map_err(ApiError::from_store)?
      .ok_or_else(|| {
        ApiError::BadRequest(format!("competency {competency_id} not found"))
      })?;
    input.expiry_date =
      Some(expires_on(input.issue_date, competency.validity_months)?);
  }

  let cert = state
    .store
    .add::<Certification>(input)
    .await
    .map_err(ApiError::from_store)?;
  Ok((
    StatusCode::CREATED,
    Json(cert.resolve(today(None), &state.policy)),
  ))
}

// ─── Single record ───────────────────────────────────────────────────────────

/// `GET /certifications/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOf>,
) -> Result<Json<ResolvedCertification>, ApiError>
where
  S: ComplianceStore,
{
  let cert = state
    .store
    .get::<Certification>(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("certification {id} not found")))?;
  Ok(Json(cert.resolve(today(params.as_of), &state.policy)))
}

/// `PATCH /certifications/{id}`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<CertificationPatch>,
) -> Result<Json<ResolvedCertification>, ApiError>
where
  S: ComplianceStore,
{
  let cert = state
    .store
    .update::<Certification>(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(cert.resolve(today(None), &state.policy)))
}

// ─── Upcoming ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingParams {
  pub tenant_id:   Option<Uuid>,
  pub within_days: Option<u32>,
  pub as_of:       Option<NaiveDate>,
}

/// `GET /certifications/upcoming`
pub async fn upcoming<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<UpcomingParams>,
) -> Result<Json<Vec<ResolvedCertification>>, ApiError>
where
  S: ComplianceStore,
{
  let filter = build_filter(params.tenant_id, [])?;
  let certs = state
    .store
    .list::<Certification>(filter)
    .await
    .map_err(ApiError::from_store)?;
  let within = params.within_days.unwrap_or(state.policy.warning_days);
  Ok(Json(compliance::upcoming(
    certs,
    today(params.as_of),
    within,
    &state.policy,
  )))
}
