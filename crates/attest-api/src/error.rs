//! API error type and [`axum::response::IntoResponse`] implementation.

use attest_core::{Classify, ErrorClass};
use attest_matrix::SkippedRow;
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("no rows could be imported")]
  NothingImported(Vec<SkippedRow>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a store or domain error onto a response class.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    match err.class() {
      ErrorClass::NotFound => Self::NotFound(err.to_string()),
      ErrorClass::Invalid => Self::BadRequest(err.to_string()),
      ErrorClass::Conflict => Self::Conflict(err.to_string()),
      ErrorClass::Internal => Self::Store(Box::new(err)),
    }
  }
}

impl From<attest_core::Error> for ApiError {
  fn from(err: attest_core::Error) -> Self { Self::from_store(err) }
}

impl From<attest_matrix::Error> for ApiError {
  fn from(err: attest_matrix::Error) -> Self {
    match err {
      attest_matrix::Error::NothingImported { skipped } => {
        Self::NothingImported(skipped)
      }
      attest_matrix::Error::Core(e) => e.into(),
      other => Self::BadRequest(other.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, json!({ "error": m }))
      }
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::NothingImported(skipped) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": self.to_string(), "skipped": skipped }),
      ),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
