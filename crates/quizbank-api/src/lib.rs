//! JSON REST API for quizbank.
//!
//! Exposes an axum [`Router`] backed by any
//! [`quizbank_core::store::QuestionBankStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", quizbank_api::api_router(store.clone()))
//! ```

pub mod banks;
pub mod error;
pub mod papers;
pub mod roles;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use quizbank_core::store::QuestionBankStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: QuestionBankStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Catalog
    .route("/roles", get(roles::list::<S>).post(roles::create::<S>))
    .route("/roles/{id}", get(roles::get_one::<S>).delete(roles::delete_one::<S>))
    // Banks
    .route(
      "/roles/{id}/bank",
      get(banks::get_one::<S>)
        .put(banks::replace::<S>)
        .delete(banks::delete_one::<S>),
    )
    .route("/roles/{id}/bank/import", post(banks::import::<S>))
    .route("/banks", get(banks::list::<S>))
    // Papers
    .route("/roles/{id}/paper", post(papers::generate::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests;
