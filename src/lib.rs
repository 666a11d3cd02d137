//! Ekin search - Exhaustive breadth-first exploration of sorted integer vectors.
//!
//! Each round expands every frontier state by the subset rule (a subset
//! with negative sum is incremented, one with positive sum decremented, a
//! zero-sum subset may go either way), deduplicates the successors against
//! every state ever seen, and records each time the largest coordinate
//! grows.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration types
//! - `compute`: Canonical states, registries, transition engine, scheduler
//!   and search loop
//! - `record`: Row sinks and lineage identifiers
//!
//! # Example
//!
//! ```rust,no_run
//! use ekin_search::{
//!     compute::SearchLoop,
//!     record::{MemorySink, Recorder},
//!     schema::SearchConfig,
//! };
//!
//! let config = SearchConfig {
//!     dimension: 3,
//!     max_iterations: 20,
//!     workers: 4,
//!     ..Default::default()
//! };
//!
//! let mut search = SearchLoop::new(config).expect("valid config");
//! let mut recorder = Recorder::new(Box::new(MemorySink::new()));
//! let result = search.run(&mut recorder).expect("search failed");
//!
//! for record in &result.history {
//!     println!("New max {} at iteration {}", record.new_max, record.iteration);
//! }
//! ```

pub mod compute;
pub mod record;
pub mod schema;

// Re-export commonly used types
pub use compute::{SearchLoop, SearchResult, StateVector, canonicalize, digest, run_search};
pub use record::{CsvSink, Recorder, RecordSink};
pub use schema::{CoordinateBounds, SearchConfig, ZeroSumPolicy};
