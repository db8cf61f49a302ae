//! Persisted run state.
//!
//! The only thing that survives between invocations is one small record per
//! configuration: when it was last rebuilt and the fingerprint it was built from.

mod storage;
mod types;

pub use storage::StateStore;
pub use types::{RunState, STATE_VERSION, StateError};
