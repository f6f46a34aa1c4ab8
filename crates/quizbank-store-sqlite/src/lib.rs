//! SQLite backend for the quizbank question store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each role's bank lives in its own
//! table; tables are only created inside a structural upgrade that bumps
//! `PRAGMA user_version`, serialised by the [`UpgradeCoordinator`].

mod encode;
mod migrate;
mod schema;
mod store;

pub mod engine;
pub mod error;
pub mod upgrade;

pub use engine::{SchemaEngine, SqliteEngine, UpgradePlan, UpgradeReport};
pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};
pub use upgrade::{DEFAULT_UPGRADE_TIMEOUT, UpgradeCoordinator, UpgradeState};
