//! Implementation of the `rbuild run` command.
//!
//! One scheduled invocation: decide, and if due rebuild, clean up and record
//! the new state.

use std::time::Instant;

use anyhow::Result;

use rbuild_lib::config::Configuration;
use rbuild_lib::driver::{Invocation, invoke, now_epoch_secs};
use rbuild_lib::trigger::next_due_at;

use super::{Context, async_runtime};
use crate::output::{format_duration, format_moment, format_timestamp, print_info, print_stat, print_success, print_warning};

pub fn cmd_run(config: Configuration, ctx: &Context) -> Result<()> {
  let start = Instant::now();
  let now = now_epoch_secs();
  let period_config = config.clone();

  let rt = async_runtime()?;
  let invocation = rt.block_on(invoke(config, &ctx.state_dir, &ctx.docker, now))?;

  match invocation {
    Invocation::Skipped { decision, state } => {
      print_info(&format!("Rebuild {}", decision.reason));
      if let Some(state) = state {
        let due = next_due_at(&period_config, &state);
        print_stat("Last build", &format_timestamp(state.last_build_timestamp));
        print_stat("Next due", &format_moment(due, now));
      }
    }
    Invocation::Rebuilt {
      decision,
      generation,
      cleanup,
      ..
    } => {
      print_success(&format!("Rebuilt {} ({})", generation.project, decision.reason));
      print_stat("Images built", &generation.images.len().to_string());
      print_stat("Images removed", &cleanup.images_removed.to_string());
      print_stat("Duration", &format_duration(start.elapsed()));
      for warning in &cleanup.warnings {
        print_warning(&format!("Cleanup: {}", warning));
      }
    }
  }

  Ok(())
}
