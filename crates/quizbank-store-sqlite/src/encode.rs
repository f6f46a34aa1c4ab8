//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Banks are stored as compact
//! JSON of the storage form (short type key → question list).

use chrono::{DateTime, Utc};
use quizbank_core::{
  codec,
  question::{QuestionCollection, StoredCollection},
  role::Role,
};

use crate::{Error, Result};

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Banks ───────────────────────────────────────────────────────────────────

pub fn encode_bank(collection: &QuestionCollection) -> Result<String> {
  Ok(serde_json::to_string(&codec::encode_collection(collection))?)
}

pub fn decode_bank(s: &str) -> Result<QuestionCollection> {
  let stored: StoredCollection = serde_json::from_str(s)?;
  Ok(codec::decode_collection(stored))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `roles` row.
pub struct RawRole {
  pub role_id:      String,
  pub display_name: String,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawRole {
  pub const COLUMNS: &'static str = "role_id, display_name, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawRole {
      role_id:      row.get(0)?,
      display_name: row.get(1)?,
      created_at:   row.get(2)?,
      updated_at:   row.get(3)?,
    })
  }

  pub fn into_role(self) -> Result<Role> {
    Ok(Role {
      id:           self.role_id,
      display_name: self.display_name,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}
