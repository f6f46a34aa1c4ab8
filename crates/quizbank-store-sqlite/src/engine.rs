//! The storage engine seam and its SQLite implementation.
//!
//! A [`SchemaEngine`] knows its schema version, which partitions exist, and
//! how to apply a structural upgrade. Partitions can only be created inside
//! [`SchemaEngine::apply_upgrade`], which runs as one atomic transaction that
//! moves the schema from `plan.from_version` to `plan.to_version`.

use std::{collections::BTreeSet, future::Future, path::Path};

use chrono::Utc;
use quizbank_core::partition::{CATALOG_PARTITION, PartitionName};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use crate::{
  Error, Result,
  encode::encode_dt,
  migrate,
  schema::{PARTITION_EXISTS, PRAGMAS, partition_ddl},
};

// ─── Plan and report ─────────────────────────────────────────────────────────

/// What a single structural upgrade must do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePlan {
  /// The version the planner observed; the upgrade is rejected if the store
  /// has moved on.
  pub from_version: u32,
  pub to_version:   u32,
  /// Partitions to create if absent.
  pub partitions:   BTreeSet<PartitionName>,
}

impl UpgradePlan {
  /// A plan for the version right after `from_version`.
  pub fn next(from_version: u32, partitions: BTreeSet<PartitionName>) -> Self {
    Self { from_version, to_version: from_version + 1, partitions }
  }
}

/// The outcome of a committed upgrade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeReport {
  pub from_version:   u32,
  pub to_version:     u32,
  /// Partitions that did not exist before this upgrade.
  pub created:        Vec<PartitionName>,
  /// Role ids carried over from the legacy single-partition layout.
  pub migrated_roles: Vec<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a partitioned, versioned key-value engine.
///
/// Implementations must be cheap to clone: the upgrade coordinator moves a
/// clone into the task that drives each upgrade.
pub trait SchemaEngine: Clone + Send + Sync + 'static {
  /// Current schema version (0 for a brand-new store).
  fn version(&self) -> impl Future<Output = Result<u32>> + Send + '_;

  fn has_partition<'a>(
    &'a self,
    partition: &'a PartitionName,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;

  /// Ids of every role in the catalog; empty when the catalog partition does
  /// not exist yet. Read outside any structural transaction.
  fn catalog_role_ids(&self) -> impl Future<Output = Result<Vec<String>>> + Send + '_;

  /// Apply `plan` atomically, or fail with [`Error::UpgradeConflict`] if the
  /// stored version is not `plan.from_version`.
  fn apply_upgrade(
    &self,
    plan: UpgradePlan,
  ) -> impl Future<Output = Result<UpgradeReport>> + Send + '_;
}

// ─── SQLite engine ───────────────────────────────────────────────────────────

/// A [`SchemaEngine`] over one SQLite database.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteEngine {
  conn: tokio_rusqlite::Connection,
}

enum Applied {
  Done(UpgradeReport),
  Conflict { found: u32 },
}

impl SqliteEngine {
  /// Open (or create) the database at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path).await.map_err(|e| {
      Error::EngineUnavailable(format!("cannot open {}: {e}", path.display()))
    })?;
    Self::init(conn).await
  }

  /// Open an in-memory database for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(|e| Error::EngineUnavailable(e.to_string()))?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
      })
      .await
      .map_err(|e| Error::EngineUnavailable(e.to_string()))?;
    Ok(Self { conn })
  }

  pub(crate) fn conn(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

/// `ConnectionClosed` means the engine is gone; anything else failed while
/// laying out partitions.
fn upgrade_error(e: tokio_rusqlite::Error) -> Error {
  match e {
    tokio_rusqlite::Error::ConnectionClosed => {
      Error::EngineUnavailable("connection closed".to_owned())
    }
    other => Error::PartitionCreateFailed(other.to_string()),
  }
}

pub(crate) fn partition_exists(
  conn: &rusqlite::Connection,
  name: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(PARTITION_EXISTS, rusqlite::params![name], |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

impl SchemaEngine for SqliteEngine {
  async fn version(&self) -> Result<u32> {
    let version: u32 = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await?;
    Ok(version)
  }

  async fn has_partition(&self, partition: &PartitionName) -> Result<bool> {
    let name = partition.as_str().to_owned();
    Ok(self.conn.call(move |conn| Ok(partition_exists(conn, &name)?)).await?)
  }

  async fn catalog_role_ids(&self) -> Result<Vec<String>> {
    let ids = self
      .conn
      .call(|conn| {
        if !partition_exists(conn, CATALOG_PARTITION)? {
          return Ok(Vec::new());
        }
        let mut stmt =
          conn.prepare("SELECT role_id FROM roles ORDER BY role_id")?;
        let ids = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids)
  }

  async fn apply_upgrade(&self, plan: UpgradePlan) -> Result<UpgradeReport> {
    let now = encode_dt(Utc::now());
    let expected = plan.from_version;

    let applied = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let found: u32 = tx.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        if found != plan.from_version {
          return Ok(Applied::Conflict { found });
        }

        let mut created = Vec::new();
        for partition in &plan.partitions {
          if !partition_exists(&tx, partition.as_str())? {
            tx.execute_batch(&partition_ddl(partition))?;
            created.push(partition.clone());
          }
        }

        let migration = migrate::carry_over_legacy(&tx, &now)?;
        created.extend(migration.created);

        tx.pragma_update(None, "user_version", plan.to_version)?;
        tx.commit()?;

        Ok(Applied::Done(UpgradeReport {
          from_version: plan.from_version,
          to_version: plan.to_version,
          created,
          migrated_roles: migration.migrated_roles,
        }))
      })
      .await
      .map_err(upgrade_error)?;

    match applied {
      Applied::Done(report) => Ok(report),
      Applied::Conflict { found } => Err(Error::UpgradeConflict { expected, found }),
    }
  }
}
