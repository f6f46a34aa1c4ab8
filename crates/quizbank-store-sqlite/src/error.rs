//! Error type for `quizbank-store-sqlite`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] quizbank_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The underlying database could not be opened or has gone away.
  #[error("storage engine unavailable: {0}")]
  EngineUnavailable(String),

  #[error("schema upgrade did not finish within {0:?}; please retry")]
  UpgradeTimeout(Duration),

  /// The structural transaction found a different version than planned.
  #[error("schema version conflict: expected {expected}, found {found}; please retry")]
  UpgradeConflict { expected: u32, found: u32 },

  /// A bank was saved for a role missing from the catalog.
  #[error("role not found: {0}; create the role first")]
  RoleNotFound(String),

  #[error("failed to create partition: {0}")]
  PartitionCreateFailed(String),
}

impl Error {
  /// A copy of this error to hand to every caller waiting on the same
  /// upgrade. Kinds that carry only plain data are preserved; anything else
  /// is reported as a failed partition creation.
  pub fn for_waiters(&self) -> Self {
    match self {
      Error::EngineUnavailable(m) => Error::EngineUnavailable(m.clone()),
      Error::UpgradeTimeout(d) => Error::UpgradeTimeout(*d),
      Error::UpgradeConflict { expected, found } => Error::UpgradeConflict {
        expected: *expected,
        found:    *found,
      },
      Error::RoleNotFound(id) => Error::RoleNotFound(id.clone()),
      Error::PartitionCreateFailed(m) => Error::PartitionCreateFailed(m.clone()),
      other => Error::PartitionCreateFailed(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
