//! Test utilities for rbuild-lib.
//!
//! [`FakeRuntime`] stands in for `docker`: it records every call, and can be
//! told to fail a given operation or to time out on `up`.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::runtime::{ComposeRuntime, RuntimeError};

/// Rendered config returned by default: one built service, one pulled one.
pub const RENDERED_CONFIG: &str = r#"{
  "name": "app",
  "services": {
    "web": { "build": { "context": "/srv/app" } },
    "db": { "image": "postgres:16" }
  }
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
  Render,
  InvalidateCache,
  Build,
  Up,
  TearDown,
  PruneImages,
  PruneBuildCache,
}

#[derive(Debug, Default)]
pub struct FakeRuntime {
  rendered: Option<String>,
  failing: Vec<Call>,
  up_times_out: bool,
  calls: RefCell<Vec<Call>>,
  generation_files: RefCell<Vec<PathBuf>>,
  up_timeouts: RefCell<Vec<Duration>>,
  tear_downs: RefCell<Vec<(String, BTreeSet<String>)>>,
  prune_all: RefCell<Vec<bool>>,
}

impl FakeRuntime {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_rendered(mut self, rendered: &str) -> Self {
    self.rendered = Some(rendered.to_string());
    self
  }

  pub fn failing(mut self, call: Call) -> Self {
    self.failing.push(call);
    self
  }

  pub fn timing_out_up(mut self) -> Self {
    self.up_times_out = true;
    self
  }

  pub fn call_kinds(&self) -> Vec<Call> {
    self.calls.borrow().clone()
  }

  pub fn generation_files(&self) -> Vec<PathBuf> {
    self.generation_files.borrow().clone()
  }

  pub fn up_timeouts(&self) -> Vec<Duration> {
    self.up_timeouts.borrow().clone()
  }

  pub fn tear_downs(&self) -> Vec<(String, BTreeSet<String>)> {
    self.tear_downs.borrow().clone()
  }

  pub fn prune_all_flags(&self) -> Vec<bool> {
    self.prune_all.borrow().clone()
  }

  fn record(&self, call: Call) -> Result<(), RuntimeError> {
    self.calls.borrow_mut().push(call);
    if self.failing.contains(&call) {
      return Err(RuntimeError::Failed {
        command: format!("fake {:?}", call),
        code: Some(1),
        stderr: "injected failure".to_string(),
      });
    }
    Ok(())
  }

  fn record_file(&self, compose_file: &Path) {
    assert!(compose_file.exists(), "generation file must exist while in use");
    self.generation_files.borrow_mut().push(compose_file.to_path_buf());
  }
}

impl ComposeRuntime for FakeRuntime {
  async fn render_config(&self, _compose_files: &[PathBuf]) -> Result<String, RuntimeError> {
    self.record(Call::Render)?;
    Ok(self.rendered.clone().unwrap_or_else(|| RENDERED_CONFIG.to_string()))
  }

  async fn invalidate_cache(&self, compose_file: &Path) -> Result<(), RuntimeError> {
    self.record_file(compose_file);
    self.record(Call::InvalidateCache)
  }

  async fn build(&self, compose_file: &Path) -> Result<(), RuntimeError> {
    self.record_file(compose_file);
    self.record(Call::Build)
  }

  async fn up(&self, compose_file: &Path, timeout: Duration) -> Result<(), RuntimeError> {
    self.record_file(compose_file);
    self.up_timeouts.borrow_mut().push(timeout);
    self.record(Call::Up)?;
    if self.up_times_out {
      return Err(RuntimeError::TimedOut {
        command: "fake up".to_string(),
        timeout,
      });
    }
    Ok(())
  }

  async fn tear_down_previous(&self, project: &str, keep: &BTreeSet<String>) -> Result<usize, RuntimeError> {
    self.tear_downs.borrow_mut().push((project.to_string(), keep.clone()));
    self.record(Call::TearDown)?;
    Ok(1)
  }

  async fn prune_images(&self, all: bool) -> Result<(), RuntimeError> {
    self.prune_all.borrow_mut().push(all);
    self.record(Call::PruneImages)
  }

  async fn prune_build_cache(&self) -> Result<(), RuntimeError> {
    self.record(Call::PruneBuildCache)
  }
}
