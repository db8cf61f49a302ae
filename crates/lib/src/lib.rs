//! rbuild-lib: rebuild decisions and orchestration for docker compose projects
//!
//! One invocation of the tool is a straight line:
//! - `state`: load the record of the last successful rebuild
//! - `trigger`: decide whether a rebuild is due, and why
//! - `sequencer`: render a new generation, refresh, build, and bring it up
//! - `cleanup`: best-effort removal of the superseded generation
//! - `driver`: ties the above together and persists the new record
//!
//! External tooling is reached only through [`runtime::ComposeRuntime`].

pub mod cleanup;
pub mod config;
pub mod consts;
pub mod driver;
pub mod generation;
pub mod paths;
pub mod runtime;
pub mod sequencer;
pub mod state;
pub mod trigger;
pub mod util;
