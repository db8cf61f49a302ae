//! Hashing utilities for configuration fingerprints.
//!
//! This module provides:
//! - `ContentHash`: a full 64-character SHA-256 hash
//! - `fingerprint_files()`: order-sensitive hash over compose file contents
//! - `hash_bytes()`: arbitrary byte hashing

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether this is a well-formed SHA-256 digest: 64 lowercase hex characters.
  pub fn is_well_formed(&self) -> bool {
    self.0.len() == 64 && self.0.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error while reading a file that takes part in a fingerprint.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
  #[error("no configuration files given")]
  Empty,

  #[error("failed to read {path}: {source}")]
  ReadFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Compute the fingerprint of a list of configuration files.
///
/// Files are hashed in the order given. Each file contributes its byte length
/// (8 bytes, little endian) followed by its contents, so `[a, b]` and `[b, a]`
/// hash differently whenever `a` and `b` differ.
///
/// A missing file is an error, never an empty contribution.
pub fn fingerprint_files<P: AsRef<Path>>(paths: &[P]) -> Result<ContentHash, FingerprintError> {
  if paths.is_empty() {
    return Err(FingerprintError::Empty);
  }

  let mut hasher = Sha256::new();

  for path in paths {
    let path = path.as_ref();
    let read_err = |source| FingerprintError::ReadFile {
      path: path.to_path_buf(),
      source,
    };

    let mut file = fs::File::open(path).map_err(read_err)?;
    let len = file.metadata().map_err(read_err)?.len();
    hasher.update(len.to_le_bytes());

    let mut buffer = [0u8; 8192];
    let mut seen = 0u64;
    loop {
      let bytes_read = file.read(&mut buffer).map_err(read_err)?;
      if bytes_read == 0 {
        break;
      }
      seen += bytes_read as u64;
      hasher.update(&buffer[..bytes_read]);
    }

    // The file changed between stat and read; the frame would lie about its length.
    if seen != len {
      return Err(FingerprintError::ReadFile {
        path: path.to_path_buf(),
        source: std::io::Error::other("file changed while it was being read"),
      });
    }
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}
