//! Carry-over from the legacy single-partition layout.
//!
//! Old installations kept every bank in one `question_banks` table under the
//! record key `"all"`: a JSON object mapping role id to that role's bank in
//! storage form. The migration runs inside the structural transaction of any
//! upgrade that finds the legacy table. For each role it creates the role
//! partition, copies the bank body (unless the partition already holds one),
//! and adds a catalog entry named after the role id if none exists. The
//! legacy table is dropped afterwards.
//!
//! Migration is best-effort: an unreadable legacy record is logged and treated
//! as empty, entries that do not parse as a stored bank are logged and
//! skipped, and the table is dropped anyway.

use std::collections::BTreeMap;

use quizbank_core::{
  partition::{LEGACY_PARTITION, PartitionName},
  question::StoredCollection,
};
use rusqlite::OptionalExtension as _;

use crate::{
  engine::partition_exists,
  schema::{BANK_RECORD_KEY, LEGACY_RECORD_KEY, drop_legacy_ddl, partition_ddl},
};

#[derive(Debug, Default)]
pub(crate) struct Migration {
  pub created:        Vec<PartitionName>,
  pub migrated_roles: Vec<String>,
}

pub(crate) fn carry_over_legacy(
  tx: &rusqlite::Transaction<'_>,
  now: &str,
) -> rusqlite::Result<Migration> {
  let mut migration = Migration::default();
  if !partition_exists(tx, LEGACY_PARTITION)? {
    return Ok(migration);
  }

  let banks = match read_legacy(tx) {
    Ok(banks) => banks,
    Err(e) => {
      tracing::warn!(error = %e, "legacy question banks unreadable; nothing to migrate");
      BTreeMap::new()
    }
  };

  for (role_id, bank) in banks {
    if role_id.is_empty() {
      tracing::warn!("skipping legacy bank entry with an empty role id");
      continue;
    }
    let body = match serde_json::from_value::<StoredCollection>(bank)
      .and_then(|stored| serde_json::to_string(&stored))
    {
      Ok(body) => body,
      Err(e) => {
        tracing::warn!(role_id = %role_id, error = %e, "skipping malformed legacy bank entry");
        continue;
      }
    };

    let partition = PartitionName::for_role(&role_id);
    if !partition_exists(tx, partition.as_str())? {
      tx.execute_batch(&partition_ddl(&partition))?;
      migration.created.push(partition.clone());
    }

    tx.execute(
      &format!(
        "INSERT OR IGNORE INTO \"{partition}\" (record_key, value_json) VALUES (?1, ?2)"
      ),
      rusqlite::params![BANK_RECORD_KEY, body],
    )?;
    tx.execute(
      "INSERT OR IGNORE INTO roles (role_id, display_name, created_at, updated_at)
       VALUES (?1, ?1, ?2, ?2)",
      rusqlite::params![role_id, now],
    )?;

    migration.migrated_roles.push(role_id);
  }

  tx.execute_batch(&drop_legacy_ddl())?;
  tracing::info!(
    roles = migration.migrated_roles.len(),
    "migrated legacy question banks"
  );
  Ok(migration)
}

fn read_legacy(
  tx: &rusqlite::Transaction<'_>,
) -> Result<BTreeMap<String, serde_json::Value>, Box<dyn std::error::Error>> {
  let raw: Option<String> = tx
    .query_row(
      &format!("SELECT value_json FROM \"{LEGACY_PARTITION}\" WHERE record_key = ?1"),
      rusqlite::params![LEGACY_RECORD_KEY],
      |r| r.get(0),
    )
    .optional()?;

  match raw {
    Some(json) => Ok(serde_json::from_str(&json)?),
    None => Ok(BTreeMap::new()),
  }
}
