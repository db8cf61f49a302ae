//! One invocation, start to finish.
//!
//! validate input → fingerprint → load state → evaluate trigger →
//! (skip | rebuild → cleanup → save state)
//!
//! State is written only after a rebuild made it through `up`, and always
//! with the fingerprint that rebuild was stamped with.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::cleanup::{CleanupReport, run_cleanup};
use crate::config::{ConfigError, Configuration};
use crate::generation::{self, Generation, GenerationError};
use crate::runtime::{ComposeRuntime, RuntimeError};
use crate::sequencer::{RebuildOutcome, Stage, run_rebuild};
use crate::state::{RunState, StateError, StateStore};
use crate::trigger::{TriggerDecision, evaluate, next_due_at};
use crate::util::hash::{ContentHash, FingerprintError, fingerprint_files};

/// Process exit codes. Each fatal condition gets its own.
pub mod exit {
  pub const SUCCESS: i32 = 0;
  pub const UNEXPECTED: i32 = 1;
  pub const INPUT: i32 = 2;
  pub const PERSIST: i32 = 3;
  pub const CACHE_INVALIDATE: i32 = 4;
  pub const BUILD: i32 = 5;
  pub const UP: i32 = 6;
}

#[derive(Debug, Error)]
pub enum InvocationError {
  #[error("[input] {0}")]
  Config(#[from] ConfigError),

  #[error("[input] {0}")]
  Fingerprint(#[from] FingerprintError),

  #[error("[{stage}] {detail}")]
  Stage { stage: Stage, detail: String },

  #[error("[state] failed to persist run state: {0}")]
  Persist(#[source] StateError),

  #[error("[purge] {0}")]
  Runtime(#[from] RuntimeError),

  #[error("[purge] {0}")]
  Generation(#[from] GenerationError),
}

impl InvocationError {
  pub fn exit_code(&self) -> i32 {
    match self {
      InvocationError::Config(_) | InvocationError::Fingerprint(_) => exit::INPUT,
      InvocationError::Persist(_) => exit::PERSIST,
      InvocationError::Runtime(_) | InvocationError::Generation(_) => exit::UNEXPECTED,
      InvocationError::Stage { stage, .. } => match stage {
        Stage::CacheInvalidate => exit::CACHE_INVALIDATE,
        Stage::Build => exit::BUILD,
        Stage::Up => exit::UP,
        Stage::Cleanup => exit::UNEXPECTED,
      },
    }
  }
}

/// What a successful invocation did.
#[derive(Debug)]
pub enum Invocation {
  /// Nothing was due; no external command ran and state is untouched.
  Skipped {
    decision: TriggerDecision,
    state: Option<RunState>,
  },

  /// A rebuild ran and its state was saved.
  Rebuilt {
    decision: TriggerDecision,
    generation: Generation,
    cleanup: CleanupReport,
    state: RunState,
  },
}

impl Invocation {
  pub fn decision(&self) -> TriggerDecision {
    match self {
      Invocation::Skipped { decision, .. } | Invocation::Rebuilt { decision, .. } => *decision,
    }
  }
}

/// Current time as epoch seconds.
pub fn now_epoch_secs() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_secs()
}

/// Run one invocation against the state kept in `state_dir`.
pub async fn invoke<R: ComposeRuntime>(
  config: Configuration,
  state_dir: &Path,
  runtime: &R,
  now: u64,
) -> Result<Invocation, InvocationError> {
  let config = config.validate()?;
  let fingerprint = fingerprint_files(&config.compose_files)?;

  let store = StateStore::for_files(state_dir, &config.compose_files);
  let state = store.load();

  let decision = evaluate(&config, state.as_ref(), &fingerprint, now);
  if !decision.due {
    info!(reason = %decision.reason, path = %store.path().display(), "rebuild skipped");
    return Ok(Invocation::Skipped { decision, state });
  }

  info!(reason = %decision.reason, "rebuild due");

  let generation = match run_rebuild(runtime, &config, &fingerprint, now).await {
    RebuildOutcome::Succeeded(generation) => generation,
    RebuildOutcome::Failed { stage, detail } => return Err(InvocationError::Stage { stage, detail }),
  };

  let cleanup = run_cleanup(runtime, &config, &generation).await;

  let new_state = RunState::new(now, fingerprint, config.compose_files.clone());
  store.save(&new_state).map_err(InvocationError::Persist)?;

  Ok(Invocation::Rebuilt {
    decision,
    generation,
    cleanup,
    state: new_state,
  })
}

/// Read-only view of one configuration: what is persisted and what the
/// next `invoke` would decide.
#[derive(Debug, Serialize)]
pub struct StatusReport {
  pub state_path: PathBuf,
  pub compose_files: Vec<PathBuf>,
  pub current_fingerprint: ContentHash,
  pub state: Option<RunState>,
  pub decision: TriggerDecision,
  /// Epoch seconds at which the build period alone makes a rebuild due.
  pub next_due_at: Option<u64>,
}

/// Evaluate the trigger for `config` without running anything.
pub fn inspect(config: Configuration, state_dir: &Path, now: u64) -> Result<StatusReport, InvocationError> {
  let config = config.validate()?;
  let current_fingerprint = fingerprint_files(&config.compose_files)?;

  let store = StateStore::for_files(state_dir, &config.compose_files);
  let state = store.load();
  let decision = evaluate(&config, state.as_ref(), &current_fingerprint, now);
  let due_at = state.as_ref().map(|state| next_due_at(&config, state));

  Ok(StatusReport {
    state_path: store.path().to_path_buf(),
    compose_files: config.compose_files,
    current_fingerprint,
    state,
    decision,
    next_due_at: due_at,
  })
}

#[derive(Debug, Serialize)]
pub struct PurgeReport {
  pub project: String,
  pub images_removed: usize,
  /// Whether a persisted record existed and was removed.
  pub state_cleared: bool,
}

/// Remove every image built for the project of `config` and forget its state.
///
/// The next `invoke` after a purge always rebuilds.
pub async fn purge<R: ComposeRuntime>(
  config: Configuration,
  state_dir: &Path,
  runtime: &R,
) -> Result<PurgeReport, InvocationError> {
  let config = config.validate()?;

  let rendered = runtime.render_config(&config.compose_files).await?;
  let project = generation::project_name(&rendered)?;

  let images_removed = runtime.tear_down_previous(&project, &BTreeSet::new()).await?;

  let store = StateStore::for_files(state_dir, &config.compose_files);
  let state_cleared = store.path().exists();
  store.clear().map_err(InvocationError::Persist)?;

  info!(project = %project, images_removed, state_cleared, "purged");
  Ok(PurgeReport {
    project,
    images_removed,
    state_cleared,
  })
}
