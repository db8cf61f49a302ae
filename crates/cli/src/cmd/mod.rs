mod purge;
mod run;
mod status;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tokio::runtime::Runtime;

use rbuild_lib::runtime::DockerCompose;

pub use purge::cmd_purge;
pub use run::cmd_run;
pub use status::cmd_status;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
  pub state_dir: PathBuf,
  pub docker: DockerCompose,
}

/// Single-threaded runtime: one child process runs at a time.
fn async_runtime() -> Result<Runtime> {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")
}
