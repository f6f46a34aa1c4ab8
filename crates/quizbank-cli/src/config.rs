//! Runtime configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `QUIZBANK_*` environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use quizbank_store_sqlite::StoreOptions;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub store_path:           PathBuf,
  pub host:                 String,
  pub port:                 u16,
  pub upgrade_timeout_secs: u64,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path:           PathBuf::from("quizbank.db"),
      host:                 "127.0.0.1".to_owned(),
      port:                 5233,
      upgrade_timeout_secs: 10,
    }
  }
}

impl AppConfig {
  /// Read `file` (if it exists) and the environment.
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("QUIZBANK").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    let mut cfg: AppConfig = settings
      .try_deserialize()
      .context("failed to deserialise configuration")?;
    if cfg.upgrade_timeout_secs == 0 {
      anyhow::bail!("upgrade_timeout_secs must be at least 1");
    }
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions { upgrade_timeout: Duration::from_secs(self.upgrade_timeout_secs) }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = AppConfig::load(Path::new("/nonexistent/quizbank.toml")).unwrap();
    assert_eq!(cfg.port, 5233);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.store_options().upgrade_timeout, Duration::from_secs(10));
  }

  #[test]
  fn file_overrides_defaults() {
    let path = std::env::temp_dir()
      .join(format!("quizbank-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "port = 9000\nupgrade_timeout_secs = 3\n").unwrap();

    let cfg = AppConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.upgrade_timeout_secs, 3);
    assert_eq!(cfg.store_path, PathBuf::from("quizbank.db"));
    assert_eq!(cfg.address(), "127.0.0.1:9000");
  }

  #[test]
  fn zero_upgrade_timeout_is_rejected() {
    let path = std::env::temp_dir()
      .join(format!("quizbank-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "upgrade_timeout_secs = 0\n").unwrap();

    let err = AppConfig::load(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();

    assert!(err.to_string().contains("upgrade_timeout_secs"));
  }

  #[test]
  fn tilde_is_expanded_only_at_the_start() {
    let home = std::env::var("HOME").unwrap_or_default();
    if !home.is_empty() {
      assert_eq!(
        expand_tilde(Path::new("~/banks/q.db")),
        PathBuf::from(&home).join("banks/q.db")
      );
    }
    assert_eq!(expand_tilde(Path::new("a/~/b")), PathBuf::from("a/~/b"));
  }
}
