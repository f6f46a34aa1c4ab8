//! Role: a named grouping (e.g. a job position) that owns one question bank.
//!
//! Roles live in the schema catalog. A role's bank lives in its own partition
//! (see [`crate::partition`]), created lazily on first save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog record as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
  /// Unique, stable identifier.
  pub id:           String,
  pub display_name: String,
  pub created_at:   DateTime<Utc>,
  /// Refreshed on every save.
  pub updated_at:   DateTime<Utc>,
}

/// Input to [`crate::store::QuestionBankStore::save_role`].
///
/// `created_at` is optional: when absent the store keeps the timestamp of an
/// existing record, or stamps a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDraft {
  pub id:           String,
  pub display_name: String,
  #[serde(default)]
  pub created_at:   Option<DateTime<Utc>>,
}

impl RoleDraft {
  pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
    Self {
      id:           id.into(),
      display_name: display_name.into(),
      created_at:   None,
    }
  }
}

impl From<Role> for RoleDraft {
  fn from(role: Role) -> Self {
    Self {
      id:           role.id,
      display_name: role.display_name,
      created_at:   Some(role.created_at),
    }
  }
}
