//! Status command implementation.
//!
//! Shows the persisted record of a configuration and what the next `run`
//! would decide. Never calls docker and never writes state.

use anyhow::Result;

use rbuild_lib::config::Configuration;
use rbuild_lib::driver::{inspect, now_epoch_secs};

use super::Context;
use crate::output::{
  OutputFormat, format_moment, print_info, print_json, print_stat, print_success, truncate_hash,
};

pub fn cmd_status(config: Configuration, ctx: &Context, output: OutputFormat, verbose: bool) -> Result<()> {
  let now = now_epoch_secs();
  let report = inspect(config, &ctx.state_dir, now)?;

  if output.is_json() {
    return print_json(&report);
  }

  if report.decision.due {
    print_info(&format!("Rebuild due: {}", report.decision.reason));
  } else {
    print_success("Up to date, rebuild not due");
  }

  match &report.state {
    Some(state) => {
      print_stat("Last build", &format_moment(state.last_build_timestamp, now));
      print_stat("Recorded fingerprint", truncate_hash(state.config_fingerprint.as_str()));
    }
    None => print_stat("Last build", "never"),
  }
  print_stat("Current fingerprint", truncate_hash(report.current_fingerprint.as_str()));

  if let Some(due) = report.next_due_at {
    print_stat("Next due", &format_moment(due, now));
  }

  if verbose {
    print_stat("State file", &report.state_path.display().to_string());
    for file in &report.compose_files {
      print_stat("Compose file", &file.display().to_string());
    }
  }

  Ok(())
}
