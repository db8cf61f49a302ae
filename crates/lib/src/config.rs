//! Invocation configuration.
//!
//! A [`Configuration`] is produced by the CLI from flags and environment
//! variables and is read-only to the rest of the crate.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::consts::{DEFAULT_BUILD_PERIOD_SECS, DEFAULT_UP_TIMEOUT_SECS};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("no compose files given")]
  NoFiles,

  #[error("compose file not found: {0}")]
  NotFound(PathBuf),

  #[error("compose file is not a regular file: {0}")]
  NotAFile(PathBuf),

  #[error("compose file is not readable: {path}: {source}")]
  Unreadable {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
  /// Compose files, in the order they are passed to `docker compose -f`.
  pub compose_files: Vec<PathBuf>,

  /// Seconds a generation may run before a rebuild is due.
  pub build_period_secs: u64,

  /// Seconds `up` may take to reach a running state.
  pub up_timeout_secs: u64,

  /// Rebuild regardless of state or elapsed time.
  pub force_rebuild: bool,

  /// After a rebuild, prune every unused image on the host, not just ours.
  pub remove_images: bool,

  /// After a rebuild, prune the builder cache.
  pub prune_build_cache: bool,
}

impl Configuration {
  pub fn new(compose_files: Vec<PathBuf>) -> Self {
    Self {
      compose_files,
      build_period_secs: DEFAULT_BUILD_PERIOD_SECS,
      up_timeout_secs: DEFAULT_UP_TIMEOUT_SECS,
      force_rebuild: false,
      remove_images: false,
      prune_build_cache: false,
    }
  }

  pub fn up_timeout(&self) -> Duration {
    Duration::from_secs(self.up_timeout_secs)
  }

  /// Check every compose file exists and is readable, and canonicalize the paths.
  ///
  /// Canonical paths keep the persisted state keyed to the same record no
  /// matter which working directory the scheduler runs from.
  pub fn validate(mut self) -> Result<Self, ConfigError> {
    if self.compose_files.is_empty() {
      return Err(ConfigError::NoFiles);
    }

    let mut canonical = Vec::with_capacity(self.compose_files.len());
    for path in &self.compose_files {
      let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ConfigError::NotFound(path.clone())),
        Err(source) => {
          return Err(ConfigError::Unreadable {
            path: path.clone(),
            source,
          });
        }
      };

      if !metadata.is_file() {
        return Err(ConfigError::NotAFile(path.clone()));
      }

      fs::File::open(path).map_err(|source| ConfigError::Unreadable {
        path: path.clone(),
        source,
      })?;

      let resolved = dunce::canonicalize(path).map_err(|source| ConfigError::Unreadable {
        path: path.clone(),
        source,
      })?;
      canonical.push(resolved);
    }

    self.compose_files = canonical;
    Ok(self)
  }
}
