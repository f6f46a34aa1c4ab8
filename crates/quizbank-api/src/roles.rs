//! Handlers for `/roles` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/roles` | Ordered by id |
//! | `POST`   | `/roles` | Body: `{"id":"eng","displayName":"Engineer"}`; upsert, 201 |
//! | `GET`    | `/roles/:id` | 404 if not found |
//! | `DELETE` | `/roles/:id` | Catalog entry only; the bank partition stays |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use quizbank_core::{
  role::{Role, RoleDraft},
  store::QuestionBankStore,
};

use crate::error::ApiError;

/// `GET /roles`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<Role>>, ApiError>
where
  S: QuestionBankStore,
{
  let roles = store.list_roles().await.map_err(ApiError::store)?;
  Ok(Json(roles))
}

/// `POST /roles`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(draft): Json<RoleDraft>,
) -> Result<impl IntoResponse, ApiError>
where
  S: QuestionBankStore,
{
  if draft.id.trim().is_empty() {
    return Err(quizbank_core::Error::InvalidRoleId.into());
  }
  let role = store.save_role(draft).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(role)))
}

/// `GET /roles/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Role>, ApiError>
where
  S: QuestionBankStore,
{
  let role = require_role(store.as_ref(), &id).await?;
  Ok(Json(role))
}

/// `DELETE /roles/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: QuestionBankStore,
{
  store.delete_role(&id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// Fetch a role or fail with 404.
pub(crate) async fn require_role<S>(store: &S, id: &str) -> Result<Role, ApiError>
where
  S: QuestionBankStore,
{
  store
    .get_role(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("role {id} not found")))
}
