//! Generic CRUD handlers shared by every record collection.
//!
//! | Method   | Path                 | Notes |
//! |----------|----------------------|-------|
//! | `GET`    | `/{collection}`      | Optional `?tenant_id=` and at most one relation filter |
//! | `POST`   | `/{collection}`      | Body: the record's creation input |
//! | `GET`    | `/{collection}/{id}` | 404 if not found |
//! | `PATCH`  | `/{collection}/{id}` | Partial update; omitted fields are kept |
//! | `DELETE` | `/{collection}/{id}` | 204 on success, 409 while referenced |

use attest_core::{
  Record, RecordFilter, Relation, record::Link, store::ComplianceStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Filters ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub tenant_id:       Option<Uuid>,
  pub organization_id: Option<Uuid>,
  pub department_id:   Option<Uuid>,
  pub position_id:     Option<Uuid>,
  pub person_id:       Option<Uuid>,
  pub personnel_id:    Option<Uuid>,
  pub competency_id:   Option<Uuid>,
}

impl ListParams {
  pub fn filter(&self) -> Result<RecordFilter, ApiError> {
    build_filter(self.tenant_id, [
      (Relation::Organization, self.organization_id),
      (Relation::Department, self.department_id),
      (Relation::Position, self.position_id),
      (Relation::Person, self.person_id),
      (Relation::Personnel, self.personnel_id),
      (Relation::Competency, self.competency_id),
    ])
  }
}

/// Combine a tenant scope with at most one relation filter.
pub(crate) fn build_filter<const N: usize>(
  tenant_id: Option<Uuid>,
  relations: [(Relation, Option<Uuid>); N],
) -> Result<RecordFilter, ApiError> {
  let mut links = relations
    .into_iter()
    .filter_map(|(relation, id)| id.map(|id| Link::new(relation, id)));
  let link = links.next();
  if links.next().is_some() {
    return Err(ApiError::BadRequest(
      "filter by at most one related record".into(),
    ));
  }
  Ok(RecordFilter { tenant_id, link })
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /{collection}[?tenant_id=...][&<relation>_id=...]`
pub async fn list<S, R>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<R>>, ApiError>
where
  S: ComplianceStore,
  R: Record,
{
  let records = state
    .store
    .list::<R>(params.filter()?)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(records))
}

/// `POST /{collection}`
pub async fn create<S, R>(
  State(state): State<ApiState<S>>,
  Json(input): Json<R::New>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ComplianceStore,
  R: Record,
  R::New: DeserializeOwned,
{
  let record = state
    .store
    .add::<R>(input)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /{collection}/{id}`
pub async fn get_one<S, R>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<R>, ApiError>
where
  S: ComplianceStore,
  R: Record,
{
  let record = state
    .store
    .get::<R>(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("{} {id} not found", R::KIND)))?;
  Ok(Json(record))
}

/// `PATCH /{collection}/{id}`
pub async fn update<S, R>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<R::Patch>,
) -> Result<Json<R>, ApiError>
where
  S: ComplianceStore,
  R: Record,
  R::Patch: DeserializeOwned,
{
  let record = state
    .store
    .update::<R>(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(record))
}

/// `DELETE /{collection}/{id}`
pub async fn delete<S, R>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ComplianceStore,
  R: Record,
{
  let deleted = state
    .store
    .delete::<R>(id)
    .await
    .map_err(ApiError::from_store)?;
  if deleted {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("{} {id} not found", R::KIND)))
  }
}
