//! SQL schema for the attest SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per record of any kind. The typed record is the JSON body; the
-- key columns are copies used for filtering.
CREATE TABLE IF NOT EXISTS records (
    record_id   TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,   -- 'tenant' | 'organization' | ... | 'order'
    tenant_id   TEXT NOT NULL,   -- equals record_id for tenants
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    updated_at  TEXT NOT NULL
);

-- Outgoing references of each record, rewritten on every update.
CREATE TABLE IF NOT EXISTS record_links (
    record_id   TEXT NOT NULL REFERENCES records(record_id) ON DELETE CASCADE,
    relation    TEXT NOT NULL,   -- 'organization' | 'person' | ...
    target_id   TEXT NOT NULL,
    PRIMARY KEY (record_id, relation, target_id)
);

CREATE INDEX IF NOT EXISTS records_kind_tenant_idx ON records(kind, tenant_id);
CREATE INDEX IF NOT EXISTS records_created_idx     ON records(created_at);
CREATE INDEX IF NOT EXISTS record_links_target_idx ON record_links(target_id);

PRAGMA user_version = 1;
";
