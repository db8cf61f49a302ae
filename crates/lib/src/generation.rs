//! Image generations.
//!
//! A generation is the rendered compose document of one rebuild, with every
//! built service pinned to a fresh image tag and labelled so later runs can
//! find, and remove, what this run produced.
//!
//! ```json
//! "web": {
//!   "build": {
//!     "context": "/srv/app",
//!     "labels": {
//!       "rbuild.config_sha256": "<fingerprint>",
//!       "rbuild.build_time": "2024-01-01T00:00:00Z",
//!       "rbuild.compose_name": "app"
//!     }
//!   },
//!   "image": "rbuild-app-web:1704067200"
//! }
//! ```

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::consts::{BUILD_TIME_LABEL, COMPOSE_NAME_LABEL, CONFIG_HASH_LABEL, IMAGE_PREFIX};
use crate::util::hash::ContentHash;

#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("rendered compose config is not valid JSON: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("rendered compose config has no project name")]
  MissingName,

  #[error("rendered compose config has no services")]
  MissingServices,

  #[error("service {service} has an unsupported build section")]
  InvalidBuild { service: String },

  #[error("failed to write generation file: {0}")]
  Write(#[source] io::Error),
}

/// What a rebuild produced, used by cleanup to tell new images from old.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
  pub project: String,
  pub built_at: u64,
  pub fingerprint: ContentHash,
  /// Image references of every built service.
  pub images: BTreeSet<String>,
}

/// A stamped compose document on disk. The file is removed on drop.
#[derive(Debug)]
pub struct RenderedGeneration {
  pub generation: Generation,
  file: NamedTempFile,
}

impl RenderedGeneration {
  pub fn path(&self) -> &Path {
    self.file.path()
  }

  /// Keep the generation, deleting the file.
  pub fn into_generation(self) -> Generation {
    self.generation
  }
}

/// Tag given to `service` of `project` for the generation built at `built_at`.
pub fn image_reference(project: &str, service: &str, built_at: u64) -> String {
  format!("{}-{}-{}:{}", IMAGE_PREFIX, project, service, built_at).to_lowercase()
}

fn rfc3339(epoch_secs: u64) -> String {
  humantime::format_rfc3339_seconds(UNIX_EPOCH + Duration::from_secs(epoch_secs)).to_string()
}

/// Stamp a rendered compose document (`docker compose config --format json`).
///
/// Services with a `build` section get generation labels and a pinned image
/// tag. Services without one are left alone.
pub fn stamp(rendered: &str, fingerprint: &ContentHash, built_at: u64) -> Result<(Value, Generation), GenerationError> {
  let mut document: Value = serde_json::from_str(rendered).map_err(GenerationError::Parse)?;

  let project = name_of(&document)?;

  let services = document
    .get_mut("services")
    .and_then(Value::as_object_mut)
    .ok_or(GenerationError::MissingServices)?;

  let build_time = rfc3339(built_at);
  let mut images = BTreeSet::new();

  for (name, service) in services.iter_mut() {
    let Some(service) = service.as_object_mut() else {
      continue;
    };
    let Some(build) = service.get_mut("build") else {
      continue;
    };

    let labels = build_labels(build).ok_or_else(|| GenerationError::InvalidBuild { service: name.clone() })?;
    labels.insert(CONFIG_HASH_LABEL.to_string(), Value::from(fingerprint.as_str()));
    labels.insert(BUILD_TIME_LABEL.to_string(), Value::from(build_time.as_str()));
    labels.insert(COMPOSE_NAME_LABEL.to_string(), Value::from(project.as_str()));

    let image = image_reference(&project, name, built_at);
    service.insert("image".to_string(), Value::from(image.as_str()));
    images.insert(image);
  }

  debug!(project = %project, built = images.len(), "stamped generation");

  let generation = Generation {
    project,
    built_at,
    fingerprint: fingerprint.clone(),
    images,
  };
  Ok((document, generation))
}

/// Project name of a rendered compose document.
pub fn project_name(rendered: &str) -> Result<String, GenerationError> {
  let document: Value = serde_json::from_str(rendered).map_err(GenerationError::Parse)?;
  name_of(&document)
}

fn name_of(document: &Value) -> Result<String, GenerationError> {
  document
    .get("name")
    .and_then(Value::as_str)
    .filter(|name| !name.is_empty())
    .map(str::to_string)
    .ok_or(GenerationError::MissingName)
}

/// Normalize a service's `build` section to an object and return its label map.
///
/// Accepts the short `build: ./dir` form and list-style labels.
fn build_labels(build: &mut Value) -> Option<&mut Map<String, Value>> {
  if let Value::String(context) = build {
    let mut object = Map::new();
    object.insert("context".to_string(), Value::from(context.as_str()));
    *build = Value::Object(object);
  }

  let build = build.as_object_mut()?;
  let labels = build.entry("labels").or_insert_with(|| Value::Object(Map::new()));

  if let Value::Array(items) = labels {
    let mut object = Map::new();
    for item in items.iter() {
      let (key, value) = item.as_str()?.split_once('=').unwrap_or((item.as_str()?, ""));
      object.insert(key.to_string(), Value::from(value));
    }
    *labels = Value::Object(object);
  }

  labels.as_object_mut()
}

/// Write a stamped document to a temporary file for compose to consume.
pub fn write(document: &Value, generation: Generation) -> Result<RenderedGeneration, GenerationError> {
  let mut file = tempfile::Builder::new()
    .prefix("rbuild-")
    .suffix(".json")
    .tempfile()
    .map_err(GenerationError::Write)?;

  let content = serde_json::to_vec_pretty(document).map_err(|e| GenerationError::Write(io::Error::other(e)))?;
  file.write_all(&content).map_err(GenerationError::Write)?;
  file.flush().map_err(GenerationError::Write)?;

  debug!(path = %file.path().display(), "wrote generation file");
  Ok(RenderedGeneration { generation, file })
}
