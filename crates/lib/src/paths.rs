use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Environment variable that relocates the state directory.
pub const STATE_DIR_ENV: &str = "RBUILD_STATE_DIR";

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var_os("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(std::env::temp_dir)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(std::env::temp_dir)
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var_os("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(home_dir)
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Returns the directory holding one persisted run record per configuration.
///
/// `RBUILD_STATE_DIR` overrides the default of `{data_dir}/state`.
pub fn state_dir() -> PathBuf {
  if let Ok(path) = std::env::var(STATE_DIR_ENV) {
    return PathBuf::from(path);
  }
  data_dir().join("state")
}
