//! The version-upgrade coordinator.
//!
//! Partitions can only be created by a structural upgrade, and each upgrade
//! moves the schema to the next version. Two callers that each bump the
//! version on their own would collide, so every "I need a partition" request
//! funnels through one in-flight upgrade at a time:
//!
//! 1. A caller whose requirement is already met returns immediately.
//! 2. If no upgrade is in flight, the caller launches one on a spawned task
//!    and records its outcome channel in the shared slot.
//! 3. If an upgrade is in flight, the caller waits for its outcome. On
//!    failure it receives the same error. On success it re-checks its own
//!    requirement and, if still unmet, goes back to step 2.
//!
//! Every upgrade reads the catalog first (outside the structural
//! transaction), then creates the catalog partition, one partition per
//! catalogued role, and the requested partition, each only if absent. A
//! request that lost the race is therefore usually satisfied by the winner's
//! upgrade, and a partition skipped by an interrupted earlier upgrade is
//! repaired by the next one.
//!
//! The task clears the slot before publishing its outcome, so a failure never
//! blocks later callers. An upgrade that takes longer than the configured
//! timeout is reported as [`Error::UpgradeTimeout`]; if the engine finishes
//! later anyway, nothing is lost because every step is an idempotent create.

use std::{fmt, sync::Arc, time::Duration};

use quizbank_core::partition::{PartitionName, required_partitions};
use tokio::sync::{Mutex, watch};

use crate::{
  Error, Result,
  engine::{SchemaEngine, UpgradePlan, UpgradeReport},
};

/// Upper bound on a single structural upgrade.
pub const DEFAULT_UPGRADE_TIMEOUT: Duration = Duration::from_secs(10);

/// Observable coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeState {
  Idle,
  Upgrading { target_version: u32 },
  /// The most recent upgrade failed; the next request starts a new one.
  Failed { reason: String },
}

/// `None` until the in-flight upgrade finishes.
type Outcome = Option<Result<UpgradeReport>>;

#[derive(Debug, Clone)]
enum Requirement {
  Present(PartitionName),
  Absent(PartitionName),
}

impl fmt::Display for Requirement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Requirement::Present(p) => write!(f, "partition {p} present"),
      Requirement::Absent(p) => write!(f, "partition {p} absent"),
    }
  }
}

/// Serialises structural upgrades over a [`SchemaEngine`].
pub struct UpgradeCoordinator<E> {
  engine:    E,
  in_flight: Arc<Mutex<Option<watch::Receiver<Outcome>>>>,
  state:     Arc<watch::Sender<UpgradeState>>,
  timeout:   Duration,
}

impl<E: SchemaEngine> UpgradeCoordinator<E> {
  pub fn new(engine: E) -> Self { Self::with_timeout(engine, DEFAULT_UPGRADE_TIMEOUT) }

  pub fn with_timeout(engine: E, timeout: Duration) -> Self {
    let (state, _) = watch::channel(UpgradeState::Idle);
    Self {
      engine,
      in_flight: Arc::new(Mutex::new(None)),
      state: Arc::new(state),
      timeout,
    }
  }

  pub fn engine(&self) -> &E { &self.engine }

  pub fn state(&self) -> UpgradeState { self.state.borrow().clone() }

  /// Watch state transitions.
  pub fn subscribe(&self) -> watch::Receiver<UpgradeState> { self.state.subscribe() }

  /// Make sure `partition` exists, upgrading the schema if it does not.
  pub async fn ensure_partition(&self, partition: &PartitionName) -> Result<()> {
    self.drive(Requirement::Present(partition.clone())).await
  }

  /// Make sure the legacy partition has been migrated away.
  pub async fn migrate_legacy(&self) -> Result<()> {
    self.drive(Requirement::Absent(PartitionName::legacy())).await
  }

  async fn satisfied(&self, requirement: &Requirement) -> Result<bool> {
    match requirement {
      Requirement::Present(p) => self.engine.has_partition(p).await,
      Requirement::Absent(p) => Ok(!self.engine.has_partition(p).await?),
    }
  }

  async fn drive(&self, requirement: Requirement) -> Result<()> {
    let mut launched = false;
    loop {
      if self.satisfied(&requirement).await? {
        return Ok(());
      }
      if launched {
        return Err(Error::PartitionCreateFailed(format!(
          "{requirement} not met after upgrade"
        )));
      }

      let mut outcome = {
        let mut slot = self.in_flight.lock().await;
        match slot.as_ref() {
          Some(rx) => {
            tracing::debug!(%requirement, "waiting for in-flight schema upgrade");
            rx.clone()
          }
          None => {
            launched = true;
            let rx = self.launch(&requirement);
            *slot = Some(rx.clone());
            rx
          }
        }
      };

      wait(&mut outcome).await?;
    }
  }

  /// Spawn the task that performs one upgrade. Must be called with the slot
  /// locked.
  fn launch(&self, requirement: &Requirement) -> watch::Receiver<Outcome> {
    let (tx, rx) = watch::channel(None);
    let engine = self.engine.clone();
    let in_flight = Arc::clone(&self.in_flight);
    let state = Arc::clone(&self.state);
    let timeout = self.timeout;
    let requested = match requirement {
      Requirement::Present(p) => Some(p.clone()),
      Requirement::Absent(_) => None,
    };

    tokio::spawn(async move {
      let result =
        tokio::time::timeout(timeout, run_upgrade(&engine, requested.as_ref(), &state))
          .await
          .unwrap_or(Err(Error::UpgradeTimeout(timeout)));

      match &result {
        Ok(report) => {
          tracing::info!(
            from = report.from_version,
            to = report.to_version,
            created = report.created.len(),
            migrated = report.migrated_roles.len(),
            "schema upgrade committed"
          );
          state.send_replace(UpgradeState::Idle);
        }
        Err(e) => {
          tracing::warn!(error = %e, "schema upgrade failed");
          state.send_replace(UpgradeState::Failed { reason: e.to_string() });
        }
      }

      *in_flight.lock().await = None;
      tx.send_replace(Some(result));
    });

    rx
  }
}

async fn run_upgrade<E: SchemaEngine>(
  engine: &E,
  requested: Option<&PartitionName>,
  state: &watch::Sender<UpgradeState>,
) -> Result<UpgradeReport> {
  let snapshot = engine.catalog_role_ids().await?;
  let from_version = engine.version().await?;
  let plan = UpgradePlan::next(
    from_version,
    required_partitions(snapshot.iter().map(String::as_str), requested),
  );

  state.send_replace(UpgradeState::Upgrading { target_version: plan.to_version });
  tracing::info!(
    from = plan.from_version,
    to = plan.to_version,
    partitions = plan.partitions.len(),
    "starting schema upgrade"
  );

  engine.apply_upgrade(plan).await
}

async fn wait(outcome: &mut watch::Receiver<Outcome>) -> Result<UpgradeReport> {
  let done = outcome.wait_for(Option::is_some).await.map_err(|_| {
    Error::PartitionCreateFailed("schema upgrade task ended without an outcome".to_owned())
  })?;

  match done.as_ref() {
    Some(Ok(report)) => Ok(report.clone()),
    Some(Err(e)) => Err(e.for_waiters()),
    None => Err(Error::PartitionCreateFailed(
      "schema upgrade outcome missing".to_owned(),
    )),
  }
}
