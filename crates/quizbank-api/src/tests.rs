//! Router tests against an in-memory `SqliteStore`.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode},
  response::Response,
};
use quizbank_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn make_store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.unwrap())
}

async fn oneshot_raw(
  store: &Arc<SqliteStore>,
  method: &str,
  uri: &str,
  body: Option<String>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if body.is_some() {
    builder = builder.header("content-type", "application/json");
  }
  let req = builder
    .body(body.map(Body::from).unwrap_or_else(Body::empty))
    .unwrap();
  api_router(Arc::clone(store)).oneshot(req).await.unwrap()
}

async fn call(
  store: &Arc<SqliteStore>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let resp = oneshot_raw(store, method, uri, body.map(|b| b.to_string())).await;
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn create_role(store: &Arc<SqliteStore>, id: &str) {
  let (status, _) = call(
    store,
    "POST",
    "/roles",
    Some(json!({ "id": id, "displayName": format!("{id} team") })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
}

fn sample_questions() -> Value {
  json!([
    { "type": "单选题", "title": "2+2?", "options": ["3", "4"], "answer": "4", "score": 5 },
    { "type": 3, "title": "Rust has a GC", "answer": "false", "score": 5 },
    { "type": "fill", "title": "__ is the borrow checker's job", "answer": "aliasing", "score": 10 }
  ])
}

// ── Roles ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_role() {
  let store = make_store().await;
  create_role(&store, "eng").await;

  let (status, body) = call(&store, "GET", "/roles/eng", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["id"], "eng");
  assert_eq!(body["displayName"], "eng team");
  assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn missing_role_is_404_with_error_body() {
  let store = make_store().await;
  let (status, body) = call(&store, "GET", "/roles/nobody", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("nobody"));
}

#[tokio::test]
async fn blank_role_id_is_400() {
  let store = make_store().await;
  let (status, _) = call(
    &store,
    "POST",
    "/roles",
    Some(json!({ "id": "", "displayName": "x" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_and_delete_roles() {
  let store = make_store().await;
  create_role(&store, "qa").await;
  create_role(&store, "eng").await;

  let (_, body) = call(&store, "GET", "/roles", None).await;
  let ids: Vec<_> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["id"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(ids, vec!["eng", "qa"]);

  let (status, _) = call(&store, "DELETE", "/roles/qa", None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (_, body) = call(&store, "GET", "/roles", None).await;
  assert_eq!(body.as_array().unwrap().len(), 1);
}

// ── Banks ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn import_groups_and_saves_questions() {
  let store = make_store().await;
  create_role(&store, "eng").await;

  let (status, body) = call(
    &store,
    "POST",
    "/roles/eng/bank/import",
    Some(sample_questions()),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["imported"], 3);
  assert_eq!(body["by_type"]["判断题"], 1);

  let (status, bank) = call(&store, "GET", "/roles/eng/bank", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(bank["单选题"][0]["title"], "2+2?");
  assert_eq!(bank["填空题"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_import_is_400_and_saves_nothing() {
  let store = make_store().await;
  create_role(&store, "eng").await;

  let (status, body) = call(
    &store,
    "POST",
    "/roles/eng/bank/import",
    Some(json!([{ "type": "judge", "title": "no answer", "score": 1 }])),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("question 1"));

  let (status, _) = call(&store, "GET", "/roles/eng/bank", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn import_for_unknown_role_is_404() {
  let store = make_store().await;
  let (status, _) = call(
    &store,
    "POST",
    "/roles/ghost/bank/import",
    Some(sample_questions()),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn put_bank_accepts_storage_keys_and_lists_banks() {
  let store = make_store().await;
  create_role(&store, "eng").await;
  create_role(&store, "ops").await;

  let bank = json!({
    "judge": [{ "id": "q1", "type": 3, "title": "Disks fail", "answer": "true", "score": 1 }]
  });
  let (status, _) = call(&store, "PUT", "/roles/eng/bank", Some(bank)).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, banks) = call(&store, "GET", "/banks", None).await;
  assert_eq!(status, StatusCode::OK);
  let banks = banks.as_object().unwrap();
  assert_eq!(banks.len(), 1);
  assert_eq!(banks["eng"]["判断题"][0]["id"], "q1");
}

#[tokio::test]
async fn put_bank_rejects_non_positive_score() {
  let store = make_store().await;
  create_role(&store, "eng").await;

  let bank = json!({
    "judge": [{ "id": "q1", "type": 3, "title": "Disks fail", "answer": "true", "score": 0 }]
  });
  let (status, body) = call(&store, "PUT", "/roles/eng/bank", Some(bank)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("score"));

  let (status, _) = call(&store, "GET", "/roles/eng/bank", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn put_bank_for_unknown_role_is_404() {
  let store = make_store().await;
  let (status, _) = call(&store, "PUT", "/roles/ghost/bank", Some(json!({}))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(!store.has_bank_partition("ghost").await.unwrap());
}

#[tokio::test]
async fn delete_bank_then_get_is_404() {
  let store = make_store().await;
  create_role(&store, "eng").await;
  call(&store, "POST", "/roles/eng/bank/import", Some(sample_questions())).await;

  let (status, _) = call(&store, "DELETE", "/roles/eng/bank", None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&store, "GET", "/roles/eng/bank", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Papers ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn paper_reaches_target_when_bank_allows() {
  let store = make_store().await;
  create_role(&store, "eng").await;
  call(&store, "POST", "/roles/eng/bank/import", Some(sample_questions())).await;

  let (status, paper) = call(
    &store,
    "POST",
    "/roles/eng/paper",
    Some(json!({
      "ratios": { "单选题": 1, "judge": 1, "4": 1 },
      "target_score": 20,
      "seed": 11
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(paper["questions"].as_array().unwrap().len(), 3);
  assert_eq!(paper["totalScore"], 20.0);
  assert!(paper.get("shortfall").is_none());
}

#[tokio::test]
async fn paper_reports_shortfall() {
  let store = make_store().await;
  create_role(&store, "eng").await;
  call(&store, "POST", "/roles/eng/bank/import", Some(sample_questions())).await;

  let (status, paper) = call(
    &store,
    "POST",
    "/roles/eng/paper",
    Some(json!({ "ratios": { "single": 1 }, "target_score": 8 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(paper["totalScore"], 5.0);
  assert_eq!(paper["shortfall"], 3.0);
}

#[tokio::test]
async fn paper_rejects_unknown_ratio_key() {
  let store = make_store().await;
  create_role(&store, "eng").await;
  call(&store, "POST", "/roles/eng/bank/import", Some(sample_questions())).await;

  let (status, body) = call(
    &store,
    "POST",
    "/roles/eng/paper",
    Some(json!({ "ratios": { "essay": 1 }, "target_score": 8 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("essay"));
}

#[tokio::test]
async fn paper_without_bank_is_404() {
  let store = make_store().await;
  create_role(&store, "eng").await;
  let (status, _) = call(
    &store,
    "POST",
    "/roles/eng/paper",
    Some(json!({ "ratios": { "single": 1 }, "target_score": 8 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
