//! Implementation of the `rbuild purge` command.
//!
//! Removes every image built for the project and forgets its state, so the
//! next `run` rebuilds from scratch.

use anyhow::Result;

use rbuild_lib::config::Configuration;
use rbuild_lib::driver::purge;

use super::{Context, async_runtime};
use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success};

pub fn cmd_purge(config: Configuration, ctx: &Context, output: OutputFormat) -> Result<()> {
  let rt = async_runtime()?;
  let report = rt.block_on(purge(config, &ctx.state_dir, &ctx.docker))?;

  if output.is_json() {
    return print_json(&report);
  }

  if report.images_removed == 0 && !report.state_cleared {
    print_info(&format!("Nothing to purge for {}", report.project));
    return Ok(());
  }

  print_success(&format!("Purged {}", report.project));
  print_stat("Images removed", &report.images_removed.to_string());
  print_stat("State cleared", if report.state_cleared { "yes" } else { "no" });
  Ok(())
}
