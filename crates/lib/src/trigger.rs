//! Rebuild trigger evaluation.
//!
//! [`evaluate`] is a pure function: the caller fingerprints the compose files
//! and reads the clock, so the decision itself never touches the outside world.
//!
//! Rules, first match wins:
//!
//! 1. forced by configuration → [`TriggerReason::Forced`]
//! 2. no persisted state → [`TriggerReason::ConfigChanged`]
//! 3. fingerprint differs from the persisted one → [`TriggerReason::ConfigChanged`]
//! 4. build period elapsed → [`TriggerReason::TtlExpired`]
//! 5. otherwise → [`TriggerReason::NotDue`]

use serde::Serialize;

use crate::config::Configuration;
use crate::state::RunState;
use crate::util::hash::ContentHash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerReason {
  TtlExpired,
  ConfigChanged,
  Forced,
  NotDue,
}

impl TriggerReason {
  pub fn as_str(&self) -> &'static str {
    match self {
      TriggerReason::TtlExpired => "build period expired",
      TriggerReason::ConfigChanged => "configuration changed",
      TriggerReason::Forced => "forced",
      TriggerReason::NotDue => "not due",
    }
  }
}

impl std::fmt::Display for TriggerReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriggerDecision {
  pub due: bool,
  pub reason: TriggerReason,
}

impl TriggerDecision {
  fn due(reason: TriggerReason) -> Self {
    Self { due: true, reason }
  }

  fn not_due() -> Self {
    Self {
      due: false,
      reason: TriggerReason::NotDue,
    }
  }
}

/// Decide whether a rebuild is due.
///
/// `now` is epoch seconds. A clock that moved backwards past the last build
/// counts as no time elapsed.
pub fn evaluate(
  config: &Configuration,
  state: Option<&RunState>,
  current_fingerprint: &ContentHash,
  now: u64,
) -> TriggerDecision {
  if config.force_rebuild {
    return TriggerDecision::due(TriggerReason::Forced);
  }

  let Some(state) = state else {
    return TriggerDecision::due(TriggerReason::ConfigChanged);
  };

  if &state.config_fingerprint != current_fingerprint {
    return TriggerDecision::due(TriggerReason::ConfigChanged);
  }

  if now.saturating_sub(state.last_build_timestamp) >= config.build_period_secs {
    return TriggerDecision::due(TriggerReason::TtlExpired);
  }

  TriggerDecision::not_due()
}

/// Epoch seconds at which `state` next becomes due by elapsed time alone.
pub fn next_due_at(config: &Configuration, state: &RunState) -> u64 {
  state.last_build_timestamp.saturating_add(config.build_period_secs)
}
