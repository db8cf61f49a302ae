//! `docker` CLI implementation of [`ComposeRuntime`].
//!
//! Long-running steps (pull, build, up) inherit stdout/stderr so their
//! progress lands in the scheduler's log. Everything else is captured.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::consts::COMPOSE_NAME_LABEL;

use super::{ComposeRuntime, RuntimeError};

/// Drives `docker compose` and `docker image` through a configurable program.
#[derive(Debug, Clone)]
pub struct DockerCompose {
  program: String,
}

impl Default for DockerCompose {
  fn default() -> Self {
    Self::new("docker")
  }
}

impl DockerCompose {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  fn describe(&self, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(self.program.as_str());
    parts.extend(args.iter().map(String::as_str));
    parts.join(" ")
  }

  fn command(&self, args: &[String]) -> Command {
    let mut command = Command::new(&self.program);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);
    command
  }

  fn spawn_error(&self, source: std::io::Error) -> RuntimeError {
    RuntimeError::Spawn {
      program: self.program.clone(),
      source,
    }
  }

  /// Run a command, returning its stdout.
  async fn capture(&self, args: Vec<String>) -> Result<String, RuntimeError> {
    let described = self.describe(&args);
    debug!(command = %described, "running");

    let output = self
      .command(&args)
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .output()
      .await
      .map_err(|e| self.spawn_error(e))?;

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if !output.status.success() {
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      return Err(RuntimeError::Failed {
        command: described,
        code: output.status.code(),
        stderr,
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  /// Run a command with inherited output, waiting for it to exit.
  async fn stream(&self, args: Vec<String>) -> Result<(), RuntimeError> {
    let described = self.describe(&args);
    info!(command = %described, "running");

    let status = self
      .command(&args)
      .status()
      .await
      .map_err(|e| self.spawn_error(e))?;

    if !status.success() {
      return Err(RuntimeError::Failed {
        command: described,
        code: status.code(),
        stderr: String::new(),
      });
    }
    Ok(())
  }
}

impl ComposeRuntime for DockerCompose {
  async fn render_config(&self, compose_files: &[PathBuf]) -> Result<String, RuntimeError> {
    self
      .capture(compose_args(compose_files, &["config", "--format", "json"]))
      .await
  }

  async fn invalidate_cache(&self, compose_file: &Path) -> Result<(), RuntimeError> {
    self
      .stream(compose_args(&[compose_file], &["pull", "--ignore-buildable"]))
      .await
  }

  async fn build(&self, compose_file: &Path) -> Result<(), RuntimeError> {
    self
      .stream(compose_args(&[compose_file], &["build", "--no-cache", "--pull"]))
      .await
  }

  async fn up(&self, compose_file: &Path, timeout: Duration) -> Result<(), RuntimeError> {
    let wait_timeout = format!("--wait-timeout={}", timeout.as_secs().max(1));
    let args = compose_args(
      &[compose_file],
      &["up", "--detach", "--remove-orphans", "--wait", &wait_timeout],
    );
    let described = self.describe(&args);
    info!(command = %described, timeout = ?timeout, "running");

    let mut child = self.command(&args).spawn().map_err(|e| self.spawn_error(e))?;

    match tokio::time::timeout(timeout, child.wait()).await {
      Ok(waited) => {
        let status = waited.map_err(|e| self.spawn_error(e))?;
        if !status.success() {
          return Err(RuntimeError::Failed {
            command: described,
            code: status.code(),
            stderr: String::new(),
          });
        }
        Ok(())
      }
      Err(_) => {
        warn!(command = %described, "bring-up exceeded its timeout, killing");
        if let Err(e) = child.kill().await {
          warn!(error = %e, "failed to kill timed out command");
        }
        Err(RuntimeError::TimedOut {
          command: described,
          timeout,
        })
      }
    }
  }

  async fn tear_down_previous(&self, project: &str, keep: &BTreeSet<String>) -> Result<usize, RuntimeError> {
    let filter = format!("label={}={}", COMPOSE_NAME_LABEL, project);
    let args: Vec<String> = ["image", "ls", "--filter", &filter, "--format", "json"]
      .iter()
      .map(|s| s.to_string())
      .collect();
    let described = self.describe(&args);
    let listing = self.capture(args).await?;

    let images = parse_image_list(&listing).map_err(|e| RuntimeError::Output {
      command: described,
      message: e.to_string(),
    })?;

    let stale = stale_image_ids(&images, keep);
    if stale.is_empty() {
      debug!(project, "no superseded images");
      return Ok(0);
    }

    info!(project, count = stale.len(), "removing superseded images");
    let mut args = vec!["image".to_string(), "rm".to_string()];
    args.extend(stale.iter().cloned());
    self.capture(args).await?;

    Ok(stale.len())
  }

  async fn prune_images(&self, all: bool) -> Result<(), RuntimeError> {
    let mut args = vec!["image".to_string(), "prune".to_string(), "--force".to_string()];
    if all {
      args.push("--all".to_string());
    }
    self.capture(args).await.map(|_| ())
  }

  async fn prune_build_cache(&self) -> Result<(), RuntimeError> {
    let args = vec!["buildx".to_string(), "prune".to_string(), "--force".to_string()];
    self.capture(args).await.map(|_| ())
  }
}

/// Build `compose -f <file>... <rest>` argument lists.
fn compose_args<P: AsRef<Path>>(compose_files: &[P], rest: &[&str]) -> Vec<String> {
  let mut args = vec!["compose".to_string()];
  for file in compose_files {
    args.push("-f".to_string());
    args.push(file.as_ref().to_string_lossy().to_string());
  }
  args.extend(rest.iter().map(|s| s.to_string()));
  args
}

/// One line of `docker image ls --format json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageListEntry {
  #[serde(rename = "ID")]
  id: String,
  repository: String,
  tag: String,
}

impl ImageListEntry {
  fn reference(&self) -> String {
    format!("{}:{}", self.repository, self.tag)
  }
}

fn parse_image_list(output: &str) -> Result<Vec<ImageListEntry>, serde_json::Error> {
  output
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .map(serde_json::from_str)
    .collect()
}

/// IDs of images none of whose references are kept, in listing order.
fn stale_image_ids(images: &[ImageListEntry], keep: &BTreeSet<String>) -> Vec<String> {
  let mut kept_by_id: BTreeMap<&str, bool> = BTreeMap::new();
  let mut order = Vec::new();

  for image in images {
    let kept = keep.contains(&image.reference());
    match kept_by_id.get_mut(image.id.as_str()) {
      Some(any_kept) => *any_kept |= kept,
      None => {
        kept_by_id.insert(&image.id, kept);
        order.push(image.id.as_str());
      }
    }
  }

  order
    .into_iter()
    .filter(|id| kept_by_id.get(id) == Some(&false))
    .map(str::to_string)
    .collect()
}
