//! Schema module - Configuration types for Ekin search runs.

mod config;

pub use config::*;
