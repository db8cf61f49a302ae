use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::ContentHash;

/// Current on-disk format version of [`RunState`].
pub const STATE_VERSION: u32 = 1;

/// Record of the last successful rebuild of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
  pub version: u32,

  /// Epoch seconds at which the rebuild that produced this record started.
  pub last_build_timestamp: u64,

  /// Fingerprint of the compose files that rebuild used.
  pub config_fingerprint: ContentHash,

  /// Compose files the record belongs to, for humans reading the file.
  #[serde(default)]
  pub compose_files: Vec<PathBuf>,
}

impl RunState {
  pub fn new(last_build_timestamp: u64, config_fingerprint: ContentHash, compose_files: Vec<PathBuf>) -> Self {
    Self {
      version: STATE_VERSION,
      last_build_timestamp,
      config_fingerprint,
      compose_files,
    }
  }
}

#[derive(Debug, Error)]
pub enum StateError {
  #[error("failed to read state: {0}")]
  Read(#[source] io::Error),

  #[error("failed to parse state: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("unsupported state version: {0}")]
  UnsupportedVersion(u32),

  #[error("state holds a malformed fingerprint")]
  MalformedFingerprint,

  #[error("failed to create state directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to serialize state: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write state: {0}")]
  Write(#[source] io::Error),

  #[error("failed to remove state: {0}")]
  Remove(#[source] io::Error),
}
