//! Error type for `attest-store-sqlite`.

use attest_core::{Classify, ErrorClass, RecordKind, Relation};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] attest_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("{kind} not found: {id}")]
  NotFound { kind: RecordKind, id: Uuid },

  #[error("tenant not found: {0}")]
  UnknownTenant(Uuid),

  /// A link points at a missing record, a record of the wrong kind, or a
  /// record owned by another tenant.
  #[error("{relation} {target} does not exist in this tenant")]
  DanglingReference { relation: Relation, target: Uuid },

  #[error("{kind} {id} is still referenced by {referrers} record(s)")]
  StillReferenced {
    kind:      RecordKind,
    id:        Uuid,
    referrers: usize,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Domain failures detected inside a connection call travel back as
/// `tokio_rusqlite::Error::Other`; unwrap them here so callers see the
/// domain variant.
impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Other(boxed) => match boxed.downcast::<Error>() {
        Ok(inner) => *inner,
        Err(other) => Self::Database(tokio_rusqlite::Error::Other(other)),
      },
      other => Self::Database(other),
    }
  }
}

/// Wrap a domain error for return from a connection call.
pub(crate) fn reject(err: impl Into<Error>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err.into()))
}

impl Classify for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::Core(e) => e.class(),
      Self::NotFound { .. } => ErrorClass::NotFound,
      Self::UnknownTenant(_) | Self::DanglingReference { .. } => {
        ErrorClass::Invalid
      }
      Self::StillReferenced { .. } => ErrorClass::Conflict,
      Self::Database(_) | Self::Json(_) => ErrorClass::Internal,
    }
  }
}
