//! Error types for `quizbank-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("role id must not be empty")]
  InvalidRoleId,

  #[error("question list must not be empty")]
  EmptyImport,

  #[error("question {index}: {reason}")]
  InvalidQuestion { index: usize, reason: String },

  #[error("import payload must be a JSON array of questions")]
  NotAnArray,

  #[error("invalid ratio for {key:?}: {reason}")]
  InvalidRatio { key: String, reason: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
