//! External container tooling.
//!
//! The sequencer and cleanup stage only ever talk to a [`ComposeRuntime`].
//! [`DockerCompose`] drives the real `docker` CLI; tests substitute a
//! recording fake.

mod docker;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub use docker::DockerCompose;

/// Failure of an external command.
#[derive(Debug, Error)]
pub enum RuntimeError {
  /// The program could not be started at all.
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The command ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {command}{}", detail_suffix(.stderr))]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  /// The command did not finish within its bound and was killed.
  #[error("command timed out after {}: {command}", format_timeout(.timeout))]
  TimedOut { command: String, timeout: Duration },

  /// The command succeeded but printed something we could not interpret.
  #[error("unexpected output from {command}: {message}")]
  Output { command: String, message: String },
}

fn detail_suffix(stderr: &str) -> String {
  let trimmed = stderr.trim();
  if trimmed.is_empty() {
    String::new()
  } else {
    format!(" ({})", trimmed)
  }
}

fn format_timeout(timeout: &Duration) -> String {
  humantime::format_duration(*timeout).to_string()
}

impl RuntimeError {
  pub fn is_timeout(&self) -> bool {
    matches!(self, RuntimeError::TimedOut { .. })
  }
}

/// Narrow interface over `docker compose` and the image store.
///
/// Every method is one opaque external operation that either succeeds or
/// fails with a [`RuntimeError`]; nothing beyond that classification is
/// interpreted, except the rendered config and image listing, which are data.
#[allow(async_fn_in_trait)]
pub trait ComposeRuntime {
  /// Merge the compose files into one canonical JSON document.
  async fn render_config(&self, compose_files: &[PathBuf]) -> Result<String, RuntimeError>;

  /// Re-fetch images so nothing stale survives into the new generation.
  async fn invalidate_cache(&self, compose_file: &Path) -> Result<(), RuntimeError>;

  /// Build every service with the layer cache disabled.
  async fn build(&self, compose_file: &Path) -> Result<(), RuntimeError>;

  /// Start or replace the running containers, bounded by `timeout`.
  ///
  /// Exceeding the bound returns [`RuntimeError::TimedOut`].
  async fn up(&self, compose_file: &Path, timeout: Duration) -> Result<(), RuntimeError>;

  /// Remove every image built for `project` whose reference is not in `keep`.
  ///
  /// Returns the number of images removed.
  async fn tear_down_previous(&self, project: &str, keep: &BTreeSet<String>) -> Result<usize, RuntimeError>;

  /// Prune unused images; dangling ones only unless `all` is set.
  async fn prune_images(&self, all: bool) -> Result<(), RuntimeError>;

  /// Prune the builder cache.
  async fn prune_build_cache(&self) -> Result<(), RuntimeError>;
}
