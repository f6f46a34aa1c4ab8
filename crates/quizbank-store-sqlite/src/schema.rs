//! SQL schema for the quizbank SQLite store.
//!
//! Each partition is a table. `PRAGMA user_version` is the schema version and
//! is only ever bumped by a structural upgrade (see [`crate::engine`]).

use quizbank_core::partition::{
  CATALOG_PARTITION, LEGACY_PARTITION, PartitionKind, PartitionName,
};

/// Connection-level settings applied on every open.
pub const PRAGMAS: &str = "PRAGMA journal_mode = WAL;";

/// Record key under which a role partition keeps its bank.
pub const BANK_RECORD_KEY: &str = "data";

/// Record key of the single record in the legacy partition.
pub const LEGACY_RECORD_KEY: &str = "all";

/// DDL for `partition`; idempotent thanks to `IF NOT EXISTS`.
pub fn partition_ddl(partition: &PartitionName) -> String {
  match partition.kind() {
    PartitionKind::Catalog => format!(
      "CREATE TABLE IF NOT EXISTS {CATALOG_PARTITION} (
           role_id      TEXT PRIMARY KEY,
           display_name TEXT NOT NULL,
           created_at   TEXT NOT NULL,   -- RFC 3339 UTC
           updated_at   TEXT NOT NULL    -- RFC 3339 UTC
       );
       CREATE INDEX IF NOT EXISTS roles_display_name_idx
           ON {CATALOG_PARTITION}(display_name);"
    ),
    // Role and legacy partitions share a plain keyed-record layout.
    PartitionKind::Role | PartitionKind::Legacy => format!(
      "CREATE TABLE IF NOT EXISTS \"{partition}\" (
           record_key TEXT PRIMARY KEY,
           value_json TEXT NOT NULL
       );"
    ),
  }
}

pub fn drop_legacy_ddl() -> String {
  format!("DROP TABLE IF EXISTS \"{LEGACY_PARTITION}\";")
}

pub const PARTITION_EXISTS: &str =
  "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1";
