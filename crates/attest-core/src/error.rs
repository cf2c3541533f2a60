//! Error types for `attest-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::order::OrderStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("invalid date: {0:?}")]
  InvalidDate(String),

  #[error("empty certification area code")]
  EmptyAreaCode,

  #[error("order cannot move from {from} to {to}")]
  IllegalTransition { from: OrderStatus, to: OrderStatus },

  #[error("order {id} is {status} and can no longer be edited this way")]
  OrderLocked { id: Uuid, status: OrderStatus },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Presence check shared by the record constructors and patches.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::Validation(format!("{field} is required")));
  }
  Ok(())
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse grouping of failures, used by outer layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  NotFound,
  Invalid,
  Conflict,
  Internal,
}

/// Implemented by every error a `ComplianceStore` can return.
pub trait Classify {
  fn class(&self) -> ErrorClass;
}

impl Classify for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::Validation(_) | Self::InvalidDate(_) | Self::EmptyAreaCode => {
        ErrorClass::Invalid
      }
      Self::IllegalTransition { .. } | Self::OrderLocked { .. } => {
        ErrorClass::Conflict
      }
      Self::Serialization(_) => ErrorClass::Internal,
    }
  }
}
