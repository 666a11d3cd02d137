//! Configuration types for Ekin search runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Coordinate storage type. Bounds are checked explicitly, never by wraparound.
pub type Coord = i32;

/// Largest supported vector dimension (each state expands `2^n - 1` subsets).
pub const MAX_DIMENSION: usize = 16;

fn default_true() -> bool {
    true
}

/// Top-level search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of coordinates in every state vector.
    pub dimension: usize,
    /// Maximum number of expansion rounds.
    pub max_iterations: usize,
    /// Worker threads used during the propose phase.
    pub workers: usize,
    /// Exclusive coordinate range; reaching either end aborts the run.
    #[serde(default)]
    pub bounds: CoordinateBounds,
    /// Successor rule when a subset sums to zero.
    #[serde(default)]
    pub zero_sum: ZeroSumPolicy,
    /// Register the negation of each newly confirmed state alongside it.
    #[serde(default = "default_true")]
    pub negation_symmetry: bool,
    /// Seen-set implementation.
    #[serde(default)]
    pub registry: RegistryKind,
    /// Starting vector. Defaults to all zeros.
    #[serde(default)]
    pub initial_state: Option<Vec<Coord>>,
    /// Output files.
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dimension: 3,
            max_iterations: 10_000_000,
            workers: 8,
            bounds: CoordinateBounds::default(),
            zero_sum: ZeroSumPolicy::default(),
            negation_symmetry: true,
            registry: RegistryKind::default(),
            initial_state: None,
            output: OutputConfig::default(),
        }
    }
}

/// Exclusive bounds on coordinate values.
///
/// A state is only valid while every coordinate lies strictly between
/// `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateBounds {
    pub min: Coord,
    pub max: Coord,
}

impl CoordinateBounds {
    /// Bounds of a signed integer with the given bit width (2..=32).
    pub fn signed_bits(bits: u32) -> Self {
        let bits = bits.clamp(2, 32);
        let max = ((1i64 << (bits - 1)) - 1) as Coord;
        let min = (-(1i64 << (bits - 1))) as Coord;
        Self { min, max }
    }

    /// Whether `value` lies strictly inside the bounds.
    #[inline]
    pub fn admits(&self, value: i64) -> bool {
        value > self.min as i64 && value < self.max as i64
    }

    /// The bound `value` reached, if any.
    #[inline]
    pub fn violated_by(&self, value: i64) -> Option<Coord> {
        if value <= self.min as i64 {
            Some(self.min)
        } else if value >= self.max as i64 {
            Some(self.max)
        } else {
            None
        }
    }
}

impl Default for CoordinateBounds {
    fn default() -> Self {
        Self::signed_bits(8)
    }
}

/// What a subset whose coordinates sum to zero produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZeroSumPolicy {
    /// Emit both the incremented and the decremented successor.
    #[default]
    Both,
    /// Emit only the incremented successor.
    IncrementOnly,
}

/// Seen-set implementation selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RegistryKind {
    /// One map behind one reader-writer lock.
    #[default]
    Single,
    /// Digest-striped maps, one lock per shard.
    Striped { shards: usize },
}

/// Output destinations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Growth record CSV. Defaults to `data/size-{n}-iterations.csv`.
    #[serde(default)]
    pub growth_path: Option<PathBuf>,
    /// Write one lineage row per confirmed state.
    #[serde(default)]
    pub provenance: bool,
    /// Lineage CSV. Defaults to `data/size-{n}-lineage.csv`.
    #[serde(default)]
    pub lineage_path: Option<PathBuf>,
    /// Seed for identifier generation; random when absent.
    #[serde(default)]
    pub id_seed: Option<u64>,
}

impl SearchConfig {
    /// Resolved growth CSV path.
    pub fn growth_path(&self) -> PathBuf {
        self.output
            .growth_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("data/size-{}-iterations.csv", self.dimension)))
    }

    /// Resolved lineage CSV path.
    pub fn lineage_path(&self) -> PathBuf {
        self.output
            .lineage_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("data/size-{}-lineage.csv", self.dimension)))
    }

    /// Starting vector, all zeros unless configured.
    pub fn initial_coords(&self) -> Vec<Coord> {
        self.initial_state
            .clone()
            .unwrap_or_else(|| vec![0; self.dimension])
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 || self.dimension > MAX_DIMENSION {
            return Err(ConfigError::InvalidDimension(self.dimension));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if !self.bounds.admits(0) {
            return Err(ConfigError::InvalidBounds {
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }
        if let RegistryKind::Striped { shards: 0 } = self.registry {
            return Err(ConfigError::NoShards);
        }
        if let Some(initial) = &self.initial_state {
            if initial.len() != self.dimension {
                return Err(ConfigError::InitialStateDimension {
                    expected: self.dimension,
                    actual: initial.len(),
                });
            }
            let admitted = |c: Coord| {
                self.bounds.admits(c as i64)
                    && (!self.negation_symmetry || self.bounds.admits(-(c as i64)))
            };
            if let Some(&value) = initial.iter().find(|&&c| !admitted(c)) {
                return Err(ConfigError::InitialStateOutOfBounds(value));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Dimension must be between 1 and 16, got {0}")]
    InvalidDimension(usize),
    #[error("Worker count must be non-zero")]
    NoWorkers,
    #[error("Coordinate bounds ({min}, {max}) must strictly contain zero")]
    InvalidBounds { min: Coord, max: Coord },
    #[error("Striped registry needs at least one shard")]
    NoShards,
    #[error("Initial state has {actual} coordinates, expected {expected}")]
    InitialStateDimension { expected: usize, actual: usize },
    #[error("Initial state coordinate {0} is outside the coordinate bounds")]
    InitialStateOutOfBounds(Coord),
}
