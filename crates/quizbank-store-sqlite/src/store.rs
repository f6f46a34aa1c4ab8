//! [`SqliteStore`], the SQLite implementation of [`QuestionBankStore`].

use std::{path::Path, sync::Arc, time::Duration};

use chrono::Utc;
use quizbank_core::{
  partition::PartitionName,
  question::QuestionCollection,
  role::{Role, RoleDraft},
  store::QuestionBankStore,
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{RawRole, decode_bank, encode_bank, encode_dt},
  engine::{SchemaEngine, SqliteEngine},
  schema::BANK_RECORD_KEY,
  upgrade::{DEFAULT_UPGRADE_TIMEOUT, UpgradeCoordinator, UpgradeState},
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Tunables for [`SqliteStore::open_with`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// Upper bound on a single structural upgrade.
  pub upgrade_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self { Self { upgrade_timeout: DEFAULT_UPGRADE_TIMEOUT } }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A question-bank store backed by a single SQLite file.
///
/// Cloning is cheap; the connection and the upgrade coordinator are shared.
#[derive(Clone)]
pub struct SqliteStore {
  engine:      SqliteEngine,
  coordinator: Arc<UpgradeCoordinator<SqliteEngine>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, creating the catalog and migrating
  /// any legacy data.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let engine = SqliteEngine::open(path).await?;
    Self::bootstrap(engine, options).await
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let engine = SqliteEngine::open_in_memory().await?;
    Self::bootstrap(engine, StoreOptions::default()).await
  }

  async fn bootstrap(engine: SqliteEngine, options: StoreOptions) -> Result<Self> {
    let coordinator = Arc::new(UpgradeCoordinator::with_timeout(
      engine.clone(),
      options.upgrade_timeout,
    ));
    let store = Self { engine, coordinator };

    store
      .coordinator
      .ensure_partition(&PartitionName::catalog())
      .await?;
    store.migrate_legacy().await?;
    Ok(store)
  }

  /// Run the legacy migration if the old single-partition table is present.
  pub async fn migrate_legacy(&self) -> Result<()> {
    self.coordinator.migrate_legacy().await
  }

  /// Current schema version.
  pub async fn schema_version(&self) -> Result<u32> { self.engine.version().await }

  pub fn upgrade_state(&self) -> UpgradeState { self.coordinator.state() }

  pub async fn has_bank_partition(&self, role_id: &str) -> Result<bool> {
    self
      .engine
      .has_partition(&PartitionName::for_role(role_id))
      .await
  }

  pub fn engine(&self) -> &SqliteEngine { &self.engine }
}

// ─── QuestionBankStore impl ──────────────────────────────────────────────────

impl QuestionBankStore for SqliteStore {
  type Error = Error;

  // ── Schema catalog ────────────────────────────────────────────────────────

  async fn list_roles(&self) -> Result<Vec<Role>> {
    let raws: Vec<RawRole> = self
      .engine
      .conn()
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM roles ORDER BY role_id",
          RawRole::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawRole::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRole::into_role).collect()
  }

  async fn get_role(&self, id: &str) -> Result<Option<Role>> {
    let id = id.to_owned();

    let raw: Option<RawRole> = self
      .engine
      .conn()
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM roles WHERE role_id = ?1", RawRole::COLUMNS),
              rusqlite::params![id],
              RawRole::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRole::into_role).transpose()
  }

  async fn save_role(&self, draft: RoleDraft) -> Result<Role> {
    if draft.id.trim().is_empty() {
      return Err(quizbank_core::Error::InvalidRoleId.into());
    }

    let now = Utc::now();
    let now_str = encode_dt(now);
    // A caller-supplied creation time never lies in the future.
    let draft_created = draft.created_at.map(|c| encode_dt(c.min(now)));

    let raw: RawRole = self
      .engine
      .conn()
      .call(move |conn| {
        let existing: Option<String> = conn
          .query_row(
            "SELECT created_at FROM roles WHERE role_id = ?1",
            rusqlite::params![draft.id],
            |r| r.get(0),
          )
          .optional()?;
        let created_at = draft_created.or(existing).unwrap_or_else(|| now_str.clone());

        conn.execute(
          "INSERT INTO roles (role_id, display_name, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(role_id) DO UPDATE SET
             display_name = excluded.display_name,
             created_at   = excluded.created_at,
             updated_at   = excluded.updated_at",
          rusqlite::params![draft.id, draft.display_name, created_at, now_str],
        )?;

        Ok(RawRole {
          role_id:      draft.id,
          display_name: draft.display_name,
          created_at,
          updated_at:   now_str,
        })
      })
      .await?;

    let role = raw.into_role()?;
    tracing::debug!(role_id = %role.id, "saved role");
    Ok(role)
  }

  async fn delete_role(&self, id: &str) -> Result<()> {
    let id = id.to_owned();
    self
      .engine
      .conn()
      .call(move |conn| {
        conn.execute("DELETE FROM roles WHERE role_id = ?1", rusqlite::params![id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_roles_by_display_name(&self, name: &str) -> Result<Vec<Role>> {
    let name = name.to_owned();

    let raws: Vec<RawRole> = self
      .engine
      .conn()
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM roles INDEXED BY roles_display_name_idx
           WHERE display_name = ?1 ORDER BY role_id",
          RawRole::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![name], RawRole::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRole::into_role).collect()
  }

  // ── Question banks ────────────────────────────────────────────────────────

  async fn get_bank(&self, role_id: &str) -> Result<Option<QuestionCollection>> {
    let partition = PartitionName::for_role(role_id);
    if !self.engine.has_partition(&partition).await? {
      return Ok(None);
    }

    let raw: Option<String> = self
      .engine
      .conn()
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT value_json FROM \"{partition}\" WHERE record_key = ?1"),
              rusqlite::params![BANK_RECORD_KEY],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    let Some(json) = raw else { return Ok(None) };
    let bank = decode_bank(&json)?;
    Ok((!bank.is_empty()).then_some(bank))
  }

  async fn save_bank(&self, role_id: &str, collection: &QuestionCollection) -> Result<()> {
    let partition = PartitionName::for_role(role_id);

    if !self.engine.has_partition(&partition).await? {
      if self.get_role(role_id).await?.is_none() {
        return Err(Error::RoleNotFound(role_id.to_owned()));
      }
      self.coordinator.ensure_partition(&partition).await?;
    }

    let json = encode_bank(collection)?;
    self
      .engine
      .conn()
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO \"{partition}\" (record_key, value_json) VALUES (?1, ?2)
             ON CONFLICT(record_key) DO UPDATE SET value_json = excluded.value_json"
          ),
          rusqlite::params![BANK_RECORD_KEY, json],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      role_id,
      questions = collection.question_count(),
      "saved question bank"
    );
    Ok(())
  }

  async fn delete_bank(&self, role_id: &str) -> Result<()> {
    let partition = PartitionName::for_role(role_id);
    if !self.engine.has_partition(&partition).await? {
      return Ok(());
    }

    self
      .engine
      .conn()
      .call(move |conn| {
        conn.execute(
          &format!("DELETE FROM \"{partition}\" WHERE record_key = ?1"),
          rusqlite::params![BANK_RECORD_KEY],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
