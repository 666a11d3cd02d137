//! Compute module - The frontier-expansion engine.
//!
//! Leaves first:
//!
//! - `state`: state vectors, canonical form and digest
//! - `registry`: concurrent seen-state registries
//! - `transition`: one-step successor enumeration
//! - `scheduler`: parallel propose / serial confirm rounds
//! - `search`: the round loop, running maximum and termination

mod registry;
mod scheduler;
mod search;
mod state;
mod transition;

pub use registry::*;
pub use scheduler::*;
pub use search::*;
pub use state::*;
pub use transition::*;
