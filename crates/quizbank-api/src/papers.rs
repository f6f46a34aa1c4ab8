//! Handler for `POST /roles/:id/paper`.
//!
//! Body: `{"ratios":{"单选题":60,"judge":40},"target_score":100}`. Ratio keys
//! may be labels, storage keys or numeric codes. An optional `seed` makes the
//! draw reproducible.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, State},
};
use quizbank_core::{
  paper::{GeneratedPaper, generate_paper, parse_ratios},
  store::QuestionBankStore,
};
use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PaperRequest {
  pub ratios:       BTreeMap<String, f64>,
  #[serde(alias = "targetScore")]
  pub target_score: f64,
  #[serde(default)]
  pub seed:         Option<u64>,
}

/// `POST /roles/:id/paper`
pub async fn generate<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  Json(req): Json<PaperRequest>,
) -> Result<Json<GeneratedPaper>, ApiError>
where
  S: QuestionBankStore,
{
  if !req.target_score.is_finite() || req.target_score < 0.0 {
    return Err(ApiError::BadRequest(
      "target_score must be a non-negative number".to_owned(),
    ));
  }
  let ratios = parse_ratios(req.ratios)?;

  let bank = store
    .get_bank(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("role {id} has no question bank")))?;

  let mut rng = match req.seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };
  let paper = generate_paper(&bank, &ratios, req.target_score, &mut rng);

  tracing::debug!(
    role_id = %id,
    questions = paper.questions.len(),
    total = paper.total_score,
    "generated paper"
  );
  Ok(Json(paper))
}
