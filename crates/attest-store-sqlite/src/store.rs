//! [`SqliteStore`], the SQLite implementation of [`ComplianceStore`].

use std::{collections::HashSet, path::Path};

use attest_core::{
  Record, RecordFilter, RecordKind, Relation,
  matrix::{CompetencyMatrix, CompetencyMatrixPatch, NewCompetencyMatrix},
  order::{AttestationOrder, OrderStatus},
  store::{ComplianceStore, MatrixUpsert},
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{LinkRow, RecordRow, decode_body, encode_links, encode_uuid},
  error::reject,
  schema::SCHEMA,
};

type CallResult<T> = std::result::Result<T, tokio_rusqlite::Error>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A compliance store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Connection helpers ──────────────────────────────────────────────────────
//
// These run inside `Connection::call`, usually on an open transaction.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Write {
  Insert,
  Update,
}

fn load_body(
  conn: &Connection,
  kind: RecordKind,
  id: &str,
) -> CallResult<Option<String>> {
  let kind: &'static str = kind.into();
  Ok(
    conn
      .query_row(
        "SELECT body FROM records WHERE record_id = ?1 AND kind = ?2",
        rusqlite::params![id, kind],
        |row| row.get(0),
      )
      .optional()?,
  )
}

fn query_strings<P: rusqlite::Params>(
  conn: &Connection,
  sql: &str,
  params: P,
) -> CallResult<Vec<String>> {
  let mut stmt = conn.prepare_cached(sql)?;
  let rows = stmt
    .query_map(params, |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(rows)
}

fn check_tenant(conn: &Connection, tenant_id: Uuid) -> CallResult<()> {
  let kind: &'static str = RecordKind::Tenant.into();
  let found = conn
    .query_row(
      "SELECT 1 FROM records WHERE record_id = ?1 AND kind = ?2",
      rusqlite::params![encode_uuid(tenant_id), kind],
      |_| Ok(()),
    )
    .optional()?;
  match found {
    Some(()) => Ok(()),
    None => Err(reject(Error::UnknownTenant(tenant_id))),
  }
}

/// Every link must resolve to a record of the expected kind in `tenant`.
fn check_links(
  conn: &Connection,
  tenant: &str,
  links: &[LinkRow],
) -> CallResult<()> {
  for link in links {
    let found = conn
      .query_row(
        "SELECT 1 FROM records
         WHERE record_id = ?1 AND kind = ?2 AND tenant_id = ?3",
        rusqlite::params![link.target_id, link.target_kind(), tenant],
        |_| Ok(()),
      )
      .optional()?;
    if found.is_none() {
      return Err(reject(Error::DanglingReference {
        relation: link.relation,
        target:   link.target,
      }));
    }
  }
  Ok(())
}

fn write_links(
  conn: &Connection,
  record_id: &str,
  links: &[LinkRow],
) -> CallResult<()> {
  conn.execute(
    "DELETE FROM record_links WHERE record_id = ?1",
    rusqlite::params![record_id],
  )?;
  let mut stmt = conn.prepare_cached(
    "INSERT OR IGNORE INTO record_links (record_id, relation, target_id)
     VALUES (?1, ?2, ?3)",
  )?;
  for link in links {
    stmt.execute(rusqlite::params![
      record_id,
      link.relation_str(),
      link.target_id
    ])?;
  }
  Ok(())
}

/// Validate references and write `record` with its links.
fn save<R: Record>(
  conn: &Connection,
  record: &R,
  now: DateTime<Utc>,
  write: Write,
) -> CallResult<()> {
  if R::KIND != RecordKind::Tenant {
    check_tenant(conn, record.tenant_id())?;
  }
  let row = RecordRow::encode(record, now).map_err(reject)?;
  let links = encode_links(record);
  check_links(conn, &row.tenant_id, &links)?;

  match write {
    Write::Insert => {
      conn.execute(
        "INSERT INTO records (
           record_id, kind, tenant_id, body, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
          row.record_id,
          row.kind,
          row.tenant_id,
          row.body,
          row.created_at,
          row.updated_at,
        ],
      )?;
    }
    Write::Update => {
      conn.execute(
        "UPDATE records SET body = ?2, updated_at = ?3 WHERE record_id = ?1",
        rusqlite::params![row.record_id, row.body, row.updated_at],
      )?;
    }
  }
  write_links(conn, &row.record_id, &links)
}

/// Load, modify and save one record of kind `R`.
fn modify<R: Record>(
  conn: &Connection,
  id: Uuid,
  change: impl FnOnce(&mut R, DateTime<Utc>) -> attest_core::Result<()>,
) -> CallResult<R> {
  let Some(body) = load_body(conn, R::KIND, &encode_uuid(id))? else {
    return Err(reject(Error::NotFound { kind: R::KIND, id }));
  };
  let mut record: R = decode_body(&body).map_err(reject)?;
  let now = Utc::now();
  change(&mut record, now).map_err(reject)?;
  save(conn, &record, now, Write::Update)?;
  Ok(record)
}

/// The record plus everything that cascades with it.
fn cascade_set(
  conn: &Connection,
  kind: RecordKind,
  id: &str,
) -> CallResult<Vec<String>> {
  let mut doomed = vec![id.to_owned()];
  for child in kind.cascades() {
    let child: &'static str = (*child).into();
    doomed.extend(query_strings(
      conn,
      "SELECT DISTINCT r.record_id
       FROM record_links l
       JOIN records r ON r.record_id = l.record_id
       WHERE l.target_id = ?1 AND r.kind = ?2",
      rusqlite::params![id, child],
    )?);
  }
  Ok(doomed)
}

// ─── ComplianceStore impl ────────────────────────────────────────────────────

impl ComplianceStore for SqliteStore {
  type Error = Error;

  async fn add<R: Record>(&self, input: R::New) -> Result<R> {
    let now = Utc::now();
    let record = R::create(input, Uuid::new_v4(), now)?;

    let saved = record.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        save(&tx, &saved, now, Write::Insert)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(kind = %R::KIND, id = %record.id(), "record added");
    Ok(record)
  }

  async fn get<R: Record>(&self, id: Uuid) -> Result<Option<R>> {
    let id_str = encode_uuid(id);
    let body = self
      .conn
      .call(move |conn| load_body(conn, R::KIND, &id_str))
      .await?;
    body.as_deref().map(decode_body::<R>).transpose()
  }

  async fn update<R: Record>(&self, id: Uuid, patch: R::Patch) -> Result<R> {
    let record = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let record = modify::<R>(&tx, id, |r, now| r.apply(patch, now))?;
        tx.commit()?;
        Ok(record)
      })
      .await?;

    tracing::info!(kind = %R::KIND, %id, "record updated");
    Ok(record)
  }

  async fn delete<R: Record>(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if load_body(&tx, R::KIND, &id_str)?.is_none() {
          return Ok(0);
        }

        let doomed = cascade_set(&tx, R::KIND, &id_str)?;
        let inside: HashSet<&str> = doomed.iter().map(String::as_str).collect();
        let mut outside: HashSet<String> = HashSet::new();
        for target in &doomed {
          let referrers = query_strings(
            &tx,
            "SELECT DISTINCT record_id FROM record_links WHERE target_id = ?1",
            rusqlite::params![target],
          )?;
          outside.extend(
            referrers
              .into_iter()
              .filter(|r| !inside.contains(r.as_str())),
          );
        }
        if R::KIND == RecordKind::Tenant {
          outside.extend(query_strings(
            &tx,
            "SELECT record_id FROM records
             WHERE tenant_id = ?1 AND record_id != ?1",
            rusqlite::params![id_str],
          )?);
        }
        if !outside.is_empty() {
          return Err(reject(Error::StillReferenced {
            kind: R::KIND,
            id,
            referrers: outside.len(),
          }));
        }

        for record_id in &doomed {
          tx.execute(
            "DELETE FROM records WHERE record_id = ?1",
            rusqlite::params![record_id],
          )?;
        }
        tx.commit()?;
        Ok(doomed.len())
      })
      .await?;

    if deleted > 0 {
      tracing::info!(
        kind = %R::KIND,
        %id,
        cascaded = deleted - 1,
        "record deleted"
      );
    }
    Ok(deleted > 0)
  }

  async fn list<R: Record>(&self, filter: RecordFilter) -> Result<Vec<R>> {
    let kind: &'static str = R::KIND.into();
    let tenant = filter.tenant_id.map(encode_uuid);
    let relation: Option<&'static str> = filter.link.map(|l| l.relation.into());
    let target = filter.link.map(|l| encode_uuid(l.target));

    let bodies = self
      .conn
      .call(move |conn| {
        query_strings(
          conn,
          "SELECT r.body FROM records r
           WHERE r.kind = ?1
             AND (?2 IS NULL OR r.tenant_id = ?2)
             AND (?3 IS NULL OR EXISTS (
               SELECT 1 FROM record_links l
               WHERE l.record_id = r.record_id
                 AND l.relation  = ?3
                 AND l.target_id = ?4))
           ORDER BY r.created_at, r.record_id",
          rusqlite::params![kind, tenant, relation, target],
        )
      })
      .await?;

    tracing::debug!(kind, count = bodies.len(), "listed records");
    bodies.iter().map(|b| decode_body(b)).collect()
  }

  async fn transition_order(
    &self,
    id: Uuid,
    to: OrderStatus,
  ) -> Result<AttestationOrder> {
    let order = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let order = modify::<AttestationOrder>(&tx, id, |o, now| {
          o.transition(to, now)
        })?;
        tx.commit()?;
        Ok(order)
      })
      .await
      .map_err(Error::from)
      .inspect_err(|e| {
        if let Error::Core(attest_core::Error::IllegalTransition { from, to }) =
          e
        {
          tracing::warn!(%id, %from, %to, "rejected order transition");
        }
      })?;

    tracing::info!(%id, status = %order.status, "order status changed");
    Ok(order)
  }

  async fn upsert_matrices(
    &self,
    tenant_id: Uuid,
    matrices: Vec<NewCompetencyMatrix>,
  ) -> Result<MatrixUpsert> {
    let tenant = encode_uuid(tenant_id);
    let kind: &'static str = RecordKind::Matrix.into();
    let by_org: &'static str = Relation::Organization.into();
    let by_position: &'static str = Relation::Position.into();

    let counts = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        check_tenant(&tx, tenant_id)?;

        let now = Utc::now();
        let mut counts = MatrixUpsert::default();
        for mut input in matrices {
          input.tenant_id = tenant_id;
          let existing = query_strings(
            &tx,
            "SELECT r.body FROM records r
             WHERE r.kind = ?1 AND r.tenant_id = ?2
               AND EXISTS (SELECT 1 FROM record_links l
                 WHERE l.record_id = r.record_id
                   AND l.relation = ?3 AND l.target_id = ?4)
               AND EXISTS (SELECT 1 FROM record_links l
                 WHERE l.record_id = r.record_id
                   AND l.relation = ?5 AND l.target_id = ?6)
             ORDER BY r.created_at, r.record_id
             LIMIT 1",
            rusqlite::params![
              kind,
              tenant,
              by_org,
              encode_uuid(input.organization_id),
              by_position,
              encode_uuid(input.position_id),
            ],
          )?;

          match existing.first() {
            Some(body) => {
              let mut matrix: CompetencyMatrix =
                decode_body(body).map_err(reject)?;
              let patch = CompetencyMatrixPatch {
                required_areas: Some(input.required_areas),
              };
              matrix.apply(patch, now).map_err(reject)?;
              save(&tx, &matrix, now, Write::Update)?;
              counts.updated += 1;
            }
            None => {
              let matrix = CompetencyMatrix::create(input, Uuid::new_v4(), now)
                .map_err(reject)?;
              save(&tx, &matrix, now, Write::Insert)?;
              counts.created += 1;
            }
          }
        }

        tx.commit()?;
        Ok(counts)
      })
      .await?;

    tracing::info!(
      %tenant_id,
      created = counts.created,
      updated = counts.updated,
      "matrices imported"
    );
    Ok(counts)
  }
}
