//! Rebuild sequencing.
//!
//! Runs the external steps of one rebuild strictly in order, stopping at the
//! first failure:
//!
//! 1. `CacheInvalidate`: render and stamp a new generation, re-pull images
//! 2. `Build`: build every service without the layer cache
//! 3. `Up`: replace the running containers, bounded by the up timeout
//!
//! Nothing here touches persisted state. A failure leaves the trigger
//! condition in place, so the next scheduled run retries.

use serde::Serialize;
use tracing::{error, info};

use crate::config::Configuration;
use crate::generation::{self, Generation, RenderedGeneration};
use crate::runtime::ComposeRuntime;
use crate::util::hash::ContentHash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
  CacheInvalidate,
  Build,
  Up,
  Cleanup,
}

impl Stage {
  pub fn as_str(&self) -> &'static str {
    match self {
      Stage::CacheInvalidate => "cache-invalidate",
      Stage::Build => "build",
      Stage::Up => "up",
      Stage::Cleanup => "cleanup",
    }
  }
}

impl std::fmt::Display for Stage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug)]
pub enum RebuildOutcome {
  /// Every stage through `Up` completed; the generation is running.
  Succeeded(Generation),

  /// `stage` failed and nothing after it ran.
  Failed { stage: Stage, detail: String },
}

impl RebuildOutcome {
  pub fn succeeded(&self) -> bool {
    matches!(self, RebuildOutcome::Succeeded(_))
  }

  /// The last stage that ran.
  pub fn stage(&self) -> Stage {
    match self {
      RebuildOutcome::Succeeded(_) => Stage::Up,
      RebuildOutcome::Failed { stage, .. } => *stage,
    }
  }

  pub fn error_detail(&self) -> Option<&str> {
    match self {
      RebuildOutcome::Succeeded(_) => None,
      RebuildOutcome::Failed { detail, .. } => Some(detail.as_str()),
    }
  }

  fn failed(stage: Stage, detail: impl std::fmt::Display) -> Self {
    let detail = detail.to_string();
    error!(stage = %stage, error = %detail, "rebuild stage failed");
    RebuildOutcome::Failed { stage, detail }
  }
}

/// Run one rebuild of `config`.
///
/// `fingerprint` is the fingerprint the trigger evaluated and `now` the
/// epoch seconds the new generation is tagged with.
pub async fn run_rebuild<R: ComposeRuntime>(
  runtime: &R,
  config: &Configuration,
  fingerprint: &ContentHash,
  now: u64,
) -> RebuildOutcome {
  info!(files = config.compose_files.len(), "starting rebuild");

  let rendered = match prepare(runtime, config, fingerprint, now).await {
    Ok(rendered) => rendered,
    Err(detail) => return RebuildOutcome::failed(Stage::CacheInvalidate, detail),
  };
  let project = rendered.generation.project.clone();

  info!(project = %project, stage = %Stage::CacheInvalidate, "refreshing images");
  if let Err(e) = runtime.invalidate_cache(rendered.path()).await {
    return RebuildOutcome::failed(Stage::CacheInvalidate, e);
  }

  info!(project = %project, stage = %Stage::Build, "building");
  if let Err(e) = runtime.build(rendered.path()).await {
    return RebuildOutcome::failed(Stage::Build, e);
  }

  info!(project = %project, stage = %Stage::Up, timeout_secs = config.up_timeout_secs, "bringing up");
  if let Err(e) = runtime.up(rendered.path(), config.up_timeout()).await {
    return RebuildOutcome::failed(Stage::Up, e);
  }

  info!(project = %project, "rebuild succeeded");
  RebuildOutcome::Succeeded(rendered.into_generation())
}

async fn prepare<R: ComposeRuntime>(
  runtime: &R,
  config: &Configuration,
  fingerprint: &ContentHash,
  now: u64,
) -> Result<RenderedGeneration, String> {
  let rendered = runtime
    .render_config(&config.compose_files)
    .await
    .map_err(|e| format!("failed to render compose config: {}", e))?;
  let (document, generation) = generation::stamp(&rendered, fingerprint, now).map_err(|e| e.to_string())?;
  generation::write(&document, generation).map_err(|e| e.to_string())
}
