//! Round scheduling: parallel propose, serial confirm.
//!
//! Every frontier state is expanded on a fixed-size rayon pool. Workers only
//! read the registry. Once all expansions have returned, candidate lists are
//! walked in frontier order on the calling thread and inserted into the
//! registry; a candidate that was newly inserted joins the next frontier.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use super::registry::StateRegistry;
use super::state::StateVector;
use super::transition::{OverflowError, TransitionEngine};

/// A state confirmed as new during a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    /// The canonical state.
    pub state: StateVector,
    /// Index of the frontier state whose expansion produced it.
    pub parent: usize,
    /// True if registered as the negation of another confirmed state.
    pub mirrored: bool,
}

/// Result of one expansion round.
#[derive(Debug, Clone, Default)]
pub struct RoundOutcome {
    /// Newly confirmed states, in confirmation order.
    pub confirmed: Vec<Confirmed>,
    /// Candidates returned by workers.
    pub proposed: usize,
    /// Candidates rejected by the confirm phase.
    pub duplicates: usize,
}

impl RoundOutcome {
    /// True if the round discovered nothing.
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }

    /// Largest coordinate over every confirmed state.
    pub fn max_coordinate(&self) -> Option<i32> {
        self.confirmed.iter().map(|c| c.state.max_coordinate()).max()
    }

    /// The next frontier.
    pub fn into_frontier(self) -> Vec<StateVector> {
        self.confirmed.into_iter().map(|c| c.state).collect()
    }
}

/// Drives expansion rounds over a bounded worker pool.
pub struct FrontierScheduler {
    engine: TransitionEngine,
    pool: ThreadPool,
    mirror: bool,
}

impl FrontierScheduler {
    /// Create a scheduler with `workers` threads.
    pub fn new(
        engine: TransitionEngine,
        workers: usize,
        mirror: bool,
    ) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("ekin-worker-{i}"))
            .build()?;

        Ok(Self {
            engine,
            pool,
            mirror,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    /// Expand `frontier` and confirm its successors against `registry`.
    ///
    /// On overflow nothing is inserted: the error is raised while proposing,
    /// before the confirm phase starts.
    pub fn expand_round(
        &self,
        frontier: &[StateVector],
        registry: &dyn StateRegistry,
    ) -> Result<RoundOutcome, OverflowError> {
        let engine = &self.engine;

        // Propose. `collect` keeps frontier order and returns only once every
        // expansion has finished.
        let proposals: Vec<Vec<StateVector>> = self.pool.install(|| {
            frontier
                .par_iter()
                .map(|state| engine.expand(state, registry))
                .collect::<Result<Vec<_>, OverflowError>>()
        })?;

        Ok(self.confirm(proposals, registry))
    }

    /// Single-threaded authoritative deduplication.
    fn confirm(
        &self,
        proposals: Vec<Vec<StateVector>>,
        registry: &dyn StateRegistry,
    ) -> RoundOutcome {
        let mut outcome = RoundOutcome::default();

        for (parent, candidates) in proposals.into_iter().enumerate() {
            outcome.proposed += candidates.len();

            for candidate in candidates {
                if !registry.insert(candidate.clone()) {
                    outcome.duplicates += 1;
                    continue;
                }

                let mirror = self.mirror.then(|| candidate.negated());
                outcome.confirmed.push(Confirmed {
                    state: candidate,
                    parent,
                    mirrored: false,
                });

                if let Some(mirror) = mirror
                    && registry.insert(mirror.clone())
                {
                    outcome.confirmed.push(Confirmed {
                        state: mirror,
                        parent,
                        mirrored: true,
                    });
                }
            }
        }

        outcome
    }
}
