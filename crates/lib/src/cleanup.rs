//! Post-rebuild housekeeping.
//!
//! Runs after the new generation is up. Every step is attempted even if an
//! earlier one failed, and failures are collected as warnings: the rebuild
//! has already succeeded and nothing here can undo that.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Configuration;
use crate::generation::Generation;
use crate::runtime::ComposeRuntime;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
  /// Superseded images removed from this project.
  pub images_removed: usize,
  pub warnings: Vec<String>,
}

impl CleanupReport {
  pub fn is_clean(&self) -> bool {
    self.warnings.is_empty()
  }

  fn warn(&mut self, step: &str, error: impl std::fmt::Display) {
    let message = format!("{}: {}", step, error);
    warn!(step, error = %error, "cleanup step failed");
    self.warnings.push(message);
  }
}

/// Remove what `generation` superseded.
///
/// - images of the same project not belonging to `generation`
/// - every unused image on the host, if `remove_images` is set
/// - the builder cache, if `prune_build_cache` is set
pub async fn run_cleanup<R: ComposeRuntime>(
  runtime: &R,
  config: &Configuration,
  generation: &Generation,
) -> CleanupReport {
  let mut report = CleanupReport::default();

  match runtime
    .tear_down_previous(&generation.project, &generation.images)
    .await
  {
    Ok(removed) => report.images_removed = removed,
    Err(e) => report.warn("remove superseded images", e),
  }

  if config.remove_images {
    if let Err(e) = runtime.prune_images(true).await {
      report.warn("prune unused images", e);
    }
  }

  if config.prune_build_cache {
    if let Err(e) = runtime.prune_build_cache().await {
      report.warn("prune build cache", e);
    }
  }

  info!(
    project = %generation.project,
    images_removed = report.images_removed,
    warnings = report.warnings.len(),
    "cleanup finished"
  );
  report
}
