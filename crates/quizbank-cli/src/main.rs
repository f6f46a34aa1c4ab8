//! `quizbank`: question-bank server and command-line tools.
//!
//! Reads `quizbank.toml` (or the path given with `--config`) and
//! `QUIZBANK_*` environment variables, opens the SQLite store, then either
//! serves the JSON API or runs a one-off command against the store.
//!
//! # Usage
//!
//! ```text
//! quizbank serve
//! quizbank role add eng "Backend engineer"
//! quizbank import eng questions.json
//! quizbank paper eng --target 100 --ratio 单选题=60 --ratio judge=40
//! ```

mod config;
mod render;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use quizbank_core::{
  import::{group_by_type, parse_questions},
  paper::{generate_paper, parse_ratios},
  role::RoleDraft,
  store::QuestionBankStore,
};
use quizbank_store_sqlite::SqliteStore;
use rand::{SeedableRng, rngs::StdRng};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "quizbank", author, version, about = "Role-partitioned question banks")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "quizbank.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API under `/api`.
  Serve,
  /// Manage the role catalog.
  #[command(subcommand)]
  Role(RoleCommand),
  /// Inspect or remove question banks.
  #[command(subcommand)]
  Bank(BankCommand),
  /// Replace a role's bank with the questions in a JSON file.
  Import { role: String, file: PathBuf },
  /// Draw a paper from a role's bank.
  Paper {
    role:   String,
    /// Score to reach.
    #[arg(long)]
    target: f64,
    /// Type weight as `type=weight`; type may be a label, key or code.
    #[arg(long = "ratio", value_parser = parse_ratio_arg, required = true)]
    ratios: Vec<(String, f64)>,
    /// Heading printed above the questions; defaults to the role name.
    #[arg(long)]
    title:  Option<String>,
    /// Seed for a reproducible draw.
    #[arg(long)]
    seed:   Option<u64>,
    /// Print the paper as JSON instead of text.
    #[arg(long)]
    json:   bool,
  },
}

#[derive(Subcommand)]
enum RoleCommand {
  List,
  Add { id: String, display_name: String },
  Show { id: String },
  Rm { id: String },
}

#[derive(Subcommand)]
enum BankCommand {
  Show { role: String },
  Rm { role: String },
  List,
}

fn parse_ratio_arg(s: &str) -> Result<(String, f64), String> {
  let (key, weight) = s
    .split_once('=')
    .ok_or_else(|| format!("expected type=weight, got {s:?}"))?;
  let weight = weight
    .trim()
    .parse::<f64>()
    .map_err(|e| format!("bad weight in {s:?}: {e}"))?;
  Ok((key.trim().to_owned(), weight))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  let store = SqliteStore::open_with(&cfg.store_path, cfg.store_options())
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  match cli.command {
    Command::Serve => serve(store, &cfg).await,
    Command::Role(cmd) => role(&store, cmd).await,
    Command::Bank(cmd) => bank(&store, cmd).await,
    Command::Import { role, file } => import(&store, &role, &file).await,
    Command::Paper { role, target, ratios, title, seed, json } => {
      paper(&store, &role, target, ratios, title, seed, json).await
    }
  }
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn serve(store: SqliteStore, cfg: &AppConfig) -> anyhow::Result<()> {
  let app = axum::Router::new()
    .nest("/api", quizbank_api::api_router(Arc::new(store)))
    .layer(TraceLayer::new_for_http());
  let address = cfg.address();

  tracing::info!("Listening on http://{address}/api");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      tracing::info!("shutting down");
    })
    .await
    .context("server error")?;

  Ok(())
}

async fn role(store: &SqliteStore, cmd: RoleCommand) -> anyhow::Result<()> {
  match cmd {
    RoleCommand::List => {
      for r in store.list_roles().await? {
        println!("{}", render::role_line(&r));
      }
    }
    RoleCommand::Add { id, display_name } => {
      let r = store.save_role(RoleDraft::new(id, display_name)).await?;
      println!("{}", render::role_line(&r));
    }
    RoleCommand::Show { id } => {
      let Some(r) = store.get_role(&id).await? else {
        bail!("role {id} not found");
      };
      println!("{}", render::role_line(&r));
      match store.get_bank(&id).await? {
        Some(b) => print!("{}", render::bank_summary(&b)),
        None => println!("  (no question bank)"),
      }
    }
    RoleCommand::Rm { id } => {
      store.delete_role(&id).await?;
      println!("removed role {id}");
    }
  }
  Ok(())
}

async fn bank(store: &SqliteStore, cmd: BankCommand) -> anyhow::Result<()> {
  match cmd {
    BankCommand::Show { role } => {
      let Some(b) = store.get_bank(&role).await? else {
        bail!("role {role} has no question bank");
      };
      println!("{}", serde_json::to_string_pretty(&b)?);
    }
    BankCommand::Rm { role } => {
      store.delete_bank(&role).await?;
      println!("removed question bank of {role}");
    }
    BankCommand::List => {
      let names = store.role_display_names().await?;
      for (id, b) in store.list_banks().await? {
        let name = names.get(&id).map(String::as_str).unwrap_or(&id);
        println!("{id}\t{name}");
        print!("{}", render::bank_summary(&b));
      }
    }
  }
  Ok(())
}

async fn import(store: &SqliteStore, role: &str, file: &Path) -> anyhow::Result<()> {
  if store.get_role(role).await?.is_none() {
    bail!("role {role} not found; add it with `quizbank role add`");
  }

  let raw = std::fs::read_to_string(file)
    .with_context(|| format!("reading {}", file.display()))?;
  let questions = parse_questions(&raw)?;
  let imported = questions.len();
  let b = group_by_type(questions);
  store.save_bank(role, &b).await?;

  println!("imported {imported} questions into {role}");
  print!("{}", render::bank_summary(&b));
  Ok(())
}

async fn paper(
  store: &SqliteStore,
  role: &str,
  target: f64,
  ratios: Vec<(String, f64)>,
  title: Option<String>,
  seed: Option<u64>,
  json: bool,
) -> anyhow::Result<()> {
  let ratios = parse_ratios(ratios)?;
  let Some(b) = store.get_bank(role).await? else {
    bail!("role {role} has no question bank");
  };

  let mut rng = match seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };
  let generated = generate_paper(&b, &ratios, target, &mut rng);

  if json {
    println!("{}", serde_json::to_string_pretty(&generated)?);
    return Ok(());
  }

  let title = match title {
    Some(t) => t,
    None => store
      .get_role(role)
      .await?
      .map(|r| r.display_name)
      .unwrap_or_else(|| role.to_owned()),
  };
  print!("{}", render::paper(&title, &generated));
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ratio_args_split_on_equals() {
    assert_eq!(parse_ratio_arg("单选题=60").unwrap(), ("单选题".to_owned(), 60.0));
    assert_eq!(parse_ratio_arg(" judge = 2.5 ").unwrap(), ("judge".to_owned(), 2.5));
    assert!(parse_ratio_arg("judge").is_err());
    assert!(parse_ratio_arg("judge=lots").is_err());
  }

  #[test]
  fn cli_parses_paper_command() {
    let cli = Cli::try_parse_from([
      "quizbank", "paper", "eng", "--target", "100", "--ratio", "single=3", "--ratio",
      "5=1", "--seed", "9",
    ])
    .unwrap();
    let Command::Paper { role, target, ratios, seed, .. } = cli.command else {
      panic!("expected paper command");
    };
    assert_eq!(role, "eng");
    assert_eq!(target, 100.0);
    assert_eq!(ratios.len(), 2);
    assert_eq!(seed, Some(9));
  }

  #[test]
  fn paper_requires_a_ratio() {
    assert!(Cli::try_parse_from(["quizbank", "paper", "eng", "--target", "1"]).is_err());
  }
}
