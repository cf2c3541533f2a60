//! Encoding and decoding helpers between domain records and the plain-text
//! columns stored in SQLite.
//!
//! Timestamps are fixed-width RFC 3339 strings so they sort correctly as
//! text. UUIDs are hyphenated lowercase strings. Record bodies are compact
//! JSON.

use attest_core::{Record, Relation, record::Link};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::Result;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A `records` row ready for insertion.
pub struct RecordRow {
  pub record_id:  String,
  pub kind:       &'static str,
  pub tenant_id:  String,
  pub body:       String,
  pub created_at: String,
  pub updated_at: String,
}

impl RecordRow {
  pub fn encode<R: Record>(record: &R, now: DateTime<Utc>) -> Result<Self> {
    Ok(Self {
      record_id:  encode_uuid(record.id()),
      kind:       R::KIND.into(),
      tenant_id:  encode_uuid(record.tenant_id()),
      body:       serde_json::to_string(record)?,
      created_at: encode_dt(record.created_at()),
      updated_at: encode_dt(now),
    })
  }
}

/// A `record_links` row, minus the owning record id.
pub struct LinkRow {
  pub relation:  Relation,
  pub target:    Uuid,
  pub target_id: String,
}

impl LinkRow {
  pub fn relation_str(&self) -> &'static str { self.relation.into() }

  /// Kind the target record must have.
  pub fn target_kind(&self) -> &'static str { self.relation.target().into() }
}

pub fn encode_links<R: Record>(record: &R) -> Vec<LinkRow> {
  record.links().into_iter().map(LinkRow::from).collect()
}

impl From<Link> for LinkRow {
  fn from(link: Link) -> Self {
    Self {
      relation:  link.relation,
      target:    link.target,
      target_id: encode_uuid(link.target),
    }
  }
}

pub fn decode_body<R: Record>(body: &str) -> Result<R> {
  Ok(serde_json::from_str(body)?)
}
