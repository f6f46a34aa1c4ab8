//! Handlers for question-bank endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/roles/:id/bank` | External form keyed by type label; 404 if none |
//! | `PUT`    | `/roles/:id/bank` | Body: external form; 404 if the role is absent, 400 on an invalid question |
//! | `DELETE` | `/roles/:id/bank` | 204 |
//! | `POST`   | `/roles/:id/bank/import` | Body: raw question array; replaces the bank |
//! | `GET`    | `/banks` | Every non-empty bank keyed by role id |

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use quizbank_core::{
  import::{group_by_type, parse_questions, validate_collection},
  question::QuestionCollection,
  store::QuestionBankStore,
};
use serde::Serialize;

use crate::{error::ApiError, roles::require_role};

/// `GET /roles/:id/bank`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<QuestionCollection>, ApiError>
where
  S: QuestionBankStore,
{
  let bank = store
    .get_bank(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("role {id} has no question bank")))?;
  Ok(Json(bank))
}

/// `PUT /roles/:id/bank`
pub async fn replace<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  Json(bank): Json<QuestionCollection>,
) -> Result<StatusCode, ApiError>
where
  S: QuestionBankStore,
{
  require_role(store.as_ref(), &id).await?;
  validate_collection(&bank)?;
  store.save_bank(&id, &bank).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /roles/:id/bank`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: QuestionBankStore,
{
  store.delete_bank(&id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
  pub imported: usize,
  /// Question count per type label.
  pub by_type:  BTreeMap<String, usize>,
}

/// `POST /roles/:id/bank/import`
///
/// The body is read as text so malformed JSON is reported with the import
/// error message rather than axum's extractor rejection.
pub async fn import<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  body: String,
) -> Result<Json<ImportSummary>, ApiError>
where
  S: QuestionBankStore,
{
  require_role(store.as_ref(), &id).await?;

  let questions = parse_questions(&body)?;
  let imported = questions.len();
  let bank = group_by_type(questions);
  store.save_bank(&id, &bank).await.map_err(ApiError::store)?;

  tracing::info!(role_id = %id, imported, "imported questions");
  Ok(Json(ImportSummary {
    imported,
    by_type: bank
      .iter()
      .map(|(t, qs)| (t.label().to_owned(), qs.len()))
      .collect(),
  }))
}

/// `GET /banks`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<BTreeMap<String, QuestionCollection>>, ApiError>
where
  S: QuestionBankStore,
{
  let banks = store.list_banks().await.map_err(ApiError::store)?;
  Ok(Json(banks))
}
