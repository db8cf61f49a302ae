//! State storage for rbuild.
//!
//! # Storage Layout
//!
//! ```text
//! {state_dir}/
//! └── <key>.json      # RunState for one configuration
//! ```
//!
//! `<key>` is derived from the canonical compose file paths, so every
//! distinct configuration owns exactly one record.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::consts::STATE_KEY_LEN;
use crate::util::hash::hash_bytes;

use super::types::{RunState, STATE_VERSION, StateError};

/// Reads and writes the [`RunState`] record of one configuration.
///
/// Writes are atomic: the record is written to a temporary file in the same
/// directory, synced, then renamed over the previous record.
#[derive(Debug, Clone)]
pub struct StateStore {
  path: PathBuf,
}

impl StateStore {
  /// Create a store backed by an explicit record path.
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// Create the store for a set of compose files inside `state_dir`.
  pub fn for_files(state_dir: &Path, compose_files: &[PathBuf]) -> Self {
    Self::new(state_dir.join(format!("{}.json", state_key(compose_files))))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Read the record, reporting every problem.
  ///
  /// Returns `Ok(None)` if no record exists yet.
  pub fn read(&self) -> Result<Option<RunState>, StateError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(StateError::Read(e)),
    };

    let state: RunState = serde_json::from_str(&content).map_err(StateError::Parse)?;

    if state.version != STATE_VERSION {
      return Err(StateError::UnsupportedVersion(state.version));
    }

    if !state.config_fingerprint.is_well_formed() {
      return Err(StateError::MalformedFingerprint);
    }

    Ok(Some(state))
  }

  /// Load the record, treating any damage as "never built".
  ///
  /// A record that cannot be read or parsed forces a rebuild on this run,
  /// which then overwrites it with a good one.
  pub fn load(&self) -> Option<RunState> {
    match self.read() {
      Ok(state) => {
        debug!(path = %self.path.display(), found = state.is_some(), "loaded run state");
        state
      }
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "ignoring unusable run state");
        None
      }
    }
  }

  /// Persist the record atomically.
  pub fn save(&self, state: &RunState) -> Result<(), StateError> {
    let dir = match self.path.parent() {
      Some(dir) if !dir.as_os_str().is_empty() => dir,
      _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(StateError::CreateDir)?;

    let content = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(StateError::Write)?;
    temp.write_all(content.as_bytes()).map_err(StateError::Write)?;
    temp.as_file().sync_all().map_err(StateError::Write)?;
    temp.persist(&self.path).map_err(|e| StateError::Write(e.error))?;

    info!(
      path = %self.path.display(),
      last_build_timestamp = state.last_build_timestamp,
      "run state saved"
    );
    Ok(())
  }

  /// Remove the record. Succeeds if there is nothing to remove.
  pub fn clear(&self) -> Result<(), StateError> {
    match fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(StateError::Remove(e)),
    }
  }
}

fn state_key(compose_files: &[PathBuf]) -> String {
  let joined = compose_files
    .iter()
    .map(|p| p.to_string_lossy())
    .collect::<Vec<_>>()
    .join("\n");
  let hash = hash_bytes(joined.as_bytes());
  hash.0[..STATE_KEY_LEN].to_string()
}
