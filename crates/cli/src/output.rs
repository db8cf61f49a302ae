//! CLI output formatting utilities.
//!
//! Results go to stdout, problems to stderr. Logs from `tracing` are also on
//! stderr, so stdout of `status -o json` stays machine-readable.

use std::time::{Duration, UNIX_EPOCH};

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
}

/// First 12 characters of `hash`.
pub fn truncate_hash(hash: &str) -> &str {
  hash.char_indices().nth(12).map_or(hash, |(i, _)| &hash[..i])
}

/// Human-readable duration, whole seconds and up.
pub fn format_duration(duration: Duration) -> String {
  if duration < Duration::from_secs(1) {
    return format!("{}ms", duration.as_millis());
  }
  humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string()
}

/// 9999-12-31T23:59:59Z, the last instant RFC 3339 can express.
const MAX_TIMESTAMP_SECS: u64 = 253_402_300_799;

/// Epoch seconds as an RFC 3339 UTC timestamp, or `never` past year 9999.
pub fn format_timestamp(epoch_secs: u64) -> String {
  if epoch_secs > MAX_TIMESTAMP_SECS {
    return "never".to_string();
  }
  match UNIX_EPOCH.checked_add(Duration::from_secs(epoch_secs)) {
    Some(time) => humantime::format_rfc3339_seconds(time).to_string(),
    None => "never".to_string(),
  }
}

/// Timestamp followed by its distance from `now`, or just `never`.
pub fn format_moment(epoch_secs: u64, now: u64) -> String {
  if epoch_secs > MAX_TIMESTAMP_SECS {
    return "never".to_string();
  }
  format!("{} ({})", format_timestamp(epoch_secs), format_relative(epoch_secs, now))
}

/// `then` relative to `now`, e.g. `3h 2m ago` or `in 5m`.
pub fn format_relative(then: u64, now: u64) -> String {
  if then <= now {
    format!("{} ago", format_duration(Duration::from_secs(now - then)))
  } else {
    format!("in {}", format_duration(Duration::from_secs(then - now)))
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
