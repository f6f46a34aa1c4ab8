//! The `QuestionBankStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `quizbank-store-sqlite`). Higher layers (`quizbank-api`, `quizbank-cli`)
//! depend on this abstraction, not on any concrete backend.

use std::{collections::BTreeMap, future::Future};

use crate::{
  question::QuestionCollection,
  role::{Role, RoleDraft},
};

/// Abstraction over a question-bank store backend.
///
/// Two families of operations: the schema catalog (roles) and the per-role
/// question banks. A bank can only be saved for a role already present in the
/// catalog. Deleting a role removes its catalog entry only; the bank partition
/// is left in place.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait QuestionBankStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Schema catalog ────────────────────────────────────────────────────

  /// Every role in the catalog, ordered by id.
  fn list_roles(
    &self,
  ) -> impl Future<Output = Result<Vec<Role>, Self::Error>> + Send + '_;

  /// Retrieve a role by id. Returns `None` if not found.
  fn get_role<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + 'a;

  /// Insert or update a role and return the persisted record.
  ///
  /// `updated_at` is always set to now. `created_at` comes from the draft,
  /// else from the existing record, else now.
  fn save_role(
    &self,
    draft: RoleDraft,
  ) -> impl Future<Output = Result<Role, Self::Error>> + Send + '_;

  /// Remove a role's catalog entry. Its bank partition is not reclaimed.
  fn delete_role<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Roles whose display name equals `name` exactly.
  fn find_roles_by_display_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Vec<Role>, Self::Error>> + Send + 'a;

  /// All role ids, ordered.
  fn role_ids(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_ {
    async move {
      Ok(self.list_roles().await?.into_iter().map(|r| r.id).collect())
    }
  }

  /// Map of role id to display name.
  fn role_display_names(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, String>, Self::Error>> + Send + '_
  {
    async move {
      Ok(
        self
          .list_roles()
          .await?
          .into_iter()
          .map(|r| (r.id, r.display_name))
          .collect(),
      )
    }
  }

  // ── Question banks ────────────────────────────────────────────────────

  /// The role's bank, or `None` when the role has no partition, no record,
  /// or an empty collection.
  fn get_bank<'a>(
    &'a self,
    role_id: &'a str,
  ) -> impl Future<Output = Result<Option<QuestionCollection>, Self::Error>> + Send + 'a;

  /// Replace the role's bank. Fails if the role is not in the catalog; the
  /// role's partition is created on demand.
  fn save_bank<'a>(
    &'a self,
    role_id: &'a str,
    collection: &'a QuestionCollection,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove the role's bank record. A no-op when the partition is absent.
  fn delete_bank<'a>(
    &'a self,
    role_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Every non-empty bank, keyed by role id. Roles without a bank are
  /// omitted.
  fn list_banks(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, QuestionCollection>, Self::Error>>
  + Send
  + '_ {
    async move {
      let mut banks = BTreeMap::new();
      for role in self.list_roles().await? {
        if let Some(bank) = self.get_bank(&role.id).await? {
          banks.insert(role.id, bank);
        }
      }
      Ok(banks)
    }
  }
}
