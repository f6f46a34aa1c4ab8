//! Partition naming.
//!
//! A partition is a named, independently addressable storage unit. There is
//! one fixed catalog partition, one partition per role, and (on old
//! installations only) a single legacy partition holding every bank.
//!
//! Role partition names are derived from the role id by an injective escape:
//! lowercase ASCII letters and digits are kept, every other byte (including
//! `_` and uppercase letters) becomes `_xx`. The result only contains
//! `[a-z0-9_]`, so it is safe as an SQL identifier or a file name, even where
//! identifiers are case-insensitive.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

/// Name of the schema catalog partition.
pub const CATALOG_PARTITION: &str = "roles";

/// Name of the pre-partitioning single-store layout.
pub const LEGACY_PARTITION: &str = "question_banks";

/// Prefix shared by every role partition.
pub const ROLE_PARTITION_PREFIX: &str = "role_";

/// What a partition is for; decides how a storage engine lays it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
  Catalog,
  Role,
  Legacy,
}

/// A physical partition name.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PartitionName(String);

impl PartitionName {
  pub fn catalog() -> Self { Self(CATALOG_PARTITION.to_owned()) }

  pub fn legacy() -> Self { Self(LEGACY_PARTITION.to_owned()) }

  /// Deterministic, injective mapping from a role id to its partition.
  pub fn for_role(role_id: &str) -> Self {
    let mut name = String::with_capacity(ROLE_PARTITION_PREFIX.len() + role_id.len());
    name.push_str(ROLE_PARTITION_PREFIX);
    for &b in role_id.as_bytes() {
      if b.is_ascii_lowercase() || b.is_ascii_digit() {
        name.push(b as char);
      } else {
        name.push('_');
        name.push_str(&hex::encode([b]));
      }
    }
    Self(name)
  }

  pub fn kind(&self) -> PartitionKind {
    match self.0.as_str() {
      CATALOG_PARTITION => PartitionKind::Catalog,
      LEGACY_PARTITION => PartitionKind::Legacy,
      _ => PartitionKind::Role,
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PartitionName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Every partition a structural upgrade must guarantee, given a snapshot of
/// the catalog's role ids and the partition the caller asked for.
///
/// Always contains the catalog partition. Partitions that should already
/// exist are listed too; engines create them only if absent.
pub fn required_partitions<'a>(
  catalog_snapshot: impl IntoIterator<Item = &'a str>,
  requested: Option<&PartitionName>,
) -> BTreeSet<PartitionName> {
  let mut set: BTreeSet<PartitionName> = catalog_snapshot
    .into_iter()
    .map(PartitionName::for_role)
    .collect();
  set.insert(PartitionName::catalog());
  if let Some(p) = requested
    && p.kind() != PartitionKind::Legacy
  {
    set.insert(p.clone());
  }
  set
}
