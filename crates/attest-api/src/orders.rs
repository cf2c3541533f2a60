//! Handler for the attestation order workflow.
//!
//! Orders are created, edited and deleted through the generic record
//! handlers; status only moves through `POST /orders/{id}/status`.

use attest_core::{
  order::{AttestationOrder, OrderStatus},
  store::ComplianceStore,
};
use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
  pub status: OrderStatus,
}

/// `POST /orders/{id}/status`
///
/// 404 if the order does not exist, 409 if the workflow does not allow the
/// move.
pub async fn transition<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<TransitionBody>,
) -> Result<Json<AttestationOrder>, ApiError>
where
  S: ComplianceStore,
{
  let order = state
    .store
    .transition_order(id, body.status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(order))
}
