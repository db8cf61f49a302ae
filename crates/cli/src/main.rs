mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rbuild_lib::config::Configuration;
use rbuild_lib::consts::{DEFAULT_BUILD_PERIOD_SECS, DEFAULT_UP_TIMEOUT_SECS};
use rbuild_lib::driver::{InvocationError, exit};
use rbuild_lib::paths;
use rbuild_lib::runtime::DockerCompose;

use cmd::{Context, cmd_purge, cmd_run, cmd_status};
use output::{OutputFormat, print_error};

/// rbuild - periodically rebuild and restart docker compose projects
#[derive(Parser, Debug)]
#[command(name = "rbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (RUST_LOG overrides)
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Directory holding the per-configuration run state
  #[arg(long, global = true, env = "RBUILD_STATE_DIR", value_name = "DIR")]
  state_dir: Option<PathBuf>,

  /// docker executable to run
  #[arg(long, global = true, env = "RBUILD_DOCKER", default_value = "docker", value_name = "PROGRAM")]
  docker: String,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Rebuild and restart the project if a rebuild is due
  Run {
    /// Compose files, in merge order
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Seconds between scheduled rebuilds
    #[arg(long, env = "BUILD_PERIOD", default_value_t = DEFAULT_BUILD_PERIOD_SECS, value_name = "SECS")]
    build_period: u64,

    /// Seconds `up` may take before it is killed
    #[arg(long, env = "UP_TIMEOUT_PERIOD", default_value_t = DEFAULT_UP_TIMEOUT_SECS, value_name = "SECS")]
    up_timeout_period: u64,

    /// Rebuild even if nothing changed and the period has not elapsed
    #[arg(long)]
    force_rebuild: bool,

    /// After a rebuild, prune every unused image on the host
    #[arg(long)]
    remove_images: bool,

    /// After a rebuild, prune the build cache
    #[arg(long)]
    prune_build_cache: bool,
  },

  /// Show the recorded state and whether a rebuild is due
  Status {
    /// Compose files, in merge order
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Seconds between scheduled rebuilds
    #[arg(long, env = "BUILD_PERIOD", default_value_t = DEFAULT_BUILD_PERIOD_SECS, value_name = "SECS")]
    build_period: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Remove every image built for the project and forget its state
  Purge {
    /// Compose files, in merge order
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let ctx = Context {
    state_dir: cli.state_dir.unwrap_or_else(paths::state_dir),
    docker: DockerCompose::new(cli.docker),
  };
  debug!(state_dir = %ctx.state_dir.display(), docker = ctx.docker.program(), "starting");

  let result = match cli.command {
    Commands::Run {
      files,
      build_period,
      up_timeout_period,
      force_rebuild,
      remove_images,
      prune_build_cache,
    } => {
      let config = Configuration {
        build_period_secs: build_period,
        up_timeout_secs: up_timeout_period,
        force_rebuild,
        remove_images,
        prune_build_cache,
        ..Configuration::new(files)
      };
      cmd_run(config, &ctx)
    }
    Commands::Status {
      files,
      build_period,
      output,
    } => {
      let config = Configuration {
        build_period_secs: build_period,
        ..Configuration::new(files)
      };
      cmd_status(config, &ctx, output, cli.verbose)
    }
    Commands::Purge { files, output } => cmd_purge(Configuration::new(files), &ctx, output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::from(exit_code(&e))
    }
  }
}

fn exit_code(error: &anyhow::Error) -> u8 {
  let code = error
    .downcast_ref::<InvocationError>()
    .map(InvocationError::exit_code)
    .unwrap_or(exit::UNEXPECTED);
  u8::try_from(code).unwrap_or(1)
}
