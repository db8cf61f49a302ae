//! Names and defaults shared across the crate.

pub const APP_NAME: &str = "rbuild";

/// Default time an image generation may run before it is rebuilt (24 hours).
pub const DEFAULT_BUILD_PERIOD_SECS: u64 = 24 * 60 * 60;

/// Default bound on `docker compose up` reaching a running state.
pub const DEFAULT_UP_TIMEOUT_SECS: u64 = 60;

/// Length of the hex prefix used to name per-configuration state files.
pub const STATE_KEY_LEN: usize = 16;

pub const CONFIG_HASH_LABEL: &str = "rbuild.config_sha256";
pub const BUILD_TIME_LABEL: &str = "rbuild.build_time";
pub const COMPOSE_NAME_LABEL: &str = "rbuild.compose_name";

/// Prefix of every image tag this tool produces: `rbuild-<project>-<service>:<epoch>`.
pub const IMAGE_PREFIX: &str = "rbuild";
