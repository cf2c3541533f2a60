//! Error types for the attest-matrix codec.

use thiserror::Error;

use crate::SkippedRow;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no valid category group in {0:?}")]
  NoValidGroups(String),

  #[error("no rows could be imported ({} skipped)", skipped.len())]
  NothingImported { skipped: Vec<SkippedRow> },

  #[error(transparent)]
  Core(#[from] attest_core::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
