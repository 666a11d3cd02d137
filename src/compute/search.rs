//! Search loop: rounds, running maximum, termination.

use std::path::PathBuf;
use std::time::Instant;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::registry::{StateRegistry, build_registry};
use super::scheduler::{Confirmed, FrontierScheduler};
use super::state::StateVector;
use super::transition::{OverflowError, TransitionEngine};
use crate::record::{CsvSink, GrowthRecord, RandomIds, Recorder, SinkError};
use crate::schema::{ConfigError, Coord, SearchConfig};

/// Lifecycle of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchPhase {
    /// More rounds to run.
    Running,
    /// A round confirmed no new state.
    Converged,
    /// The iteration cap was reached.
    BudgetExhausted,
    /// An overflow or sink failure aborted the run.
    Fatal,
}

impl SearchPhase {
    pub fn is_terminal(self) -> bool {
        self != SearchPhase::Running
    }
}

/// Why a completed search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Converged,
    BudgetExhausted,
}

/// Search failures.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Overflow(#[from] OverflowError),
    #[error("Failed to record: {0}")]
    Sink(#[from] SinkError),
    #[error("Search was aborted by an earlier failure")]
    Aborted,
}

/// Progress reported after every round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Rounds completed so far.
    pub rounds: usize,
    /// States confirmed by the last round.
    pub confirmed: usize,
    /// Size of the frontier for the next round.
    pub frontier: usize,
    /// Distinct states registered.
    pub states_seen: usize,
    /// Largest coordinate seen.
    pub running_max: Coord,
    pub phase: SearchPhase,
}

/// Aggregate statistics of a finished search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    pub rounds: usize,
    pub states_seen: usize,
    /// Candidates returned by workers over the whole run.
    pub proposed: u64,
    /// Candidates rejected by confirm phases.
    pub duplicates: u64,
    pub elapsed_seconds: f64,
    pub states_per_second: f64,
    pub stop_reason: StopReason,
}

/// Outcome of a completed search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub running_max: Coord,
    /// Every rise of the running maximum, in order.
    pub history: Vec<GrowthRecord>,
    pub stats: SearchStats,
}

impl SearchResult {
    /// Rounds between consecutive rises of the maximum.
    ///
    /// The first gap is measured from round 0.
    pub fn iteration_gaps(&self) -> Vec<usize> {
        let mut previous = 0;
        self.history
            .iter()
            .map(|record| {
                let gap = record.iteration - previous;
                previous = record.iteration;
                gap
            })
            .collect()
    }
}

/// Breadth-first search over canonical states.
pub struct SearchLoop {
    config: SearchConfig,
    registry: Box<dyn StateRegistry>,
    scheduler: FrontierScheduler,
    root: StateVector,
    frontier: Vec<StateVector>,
    /// Largest coordinate confirmed so far, never below 0.
    running_max: Coord,
    iteration: usize,
    phase: SearchPhase,
    history: Vec<GrowthRecord>,
    proposed: u64,
    duplicates: u64,
    /// Whether the recorder has received headers and roots.
    begun: bool,
}

impl SearchLoop {
    /// Validate `config`, build the registry and worker pool, and seed the
    /// frontier with the initial state.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let registry = build_registry(config.registry);
        Self::with_registry(config, registry)
    }

    /// Like [`SearchLoop::new`], with a caller-supplied registry.
    pub fn with_registry(
        config: SearchConfig,
        registry: Box<dyn StateRegistry>,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let engine = TransitionEngine::from_config(&config);
        let scheduler = FrontierScheduler::new(engine, config.workers, config.negation_symmetry)?;

        let root = StateVector::new(config.initial_coords()).into_canonical();
        let mut frontier = vec![root.clone()];
        registry.insert(root.clone());
        if config.negation_symmetry {
            let mirror = root.negated();
            if registry.insert(mirror.clone()) {
                frontier.push(mirror);
            }
        }
        let running_max = frontier
            .iter()
            .map(StateVector::max_coordinate)
            .fold(0, Coord::max);

        Ok(Self {
            running_max,
            frontier,
            root,
            config,
            registry,
            scheduler,
            iteration: 0,
            phase: SearchPhase::Running,
            history: Vec::new(),
            proposed: 0,
            duplicates: 0,
            begun: false,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Canonical initial state.
    pub fn root(&self) -> &StateVector {
        &self.root
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn running_max(&self) -> Coord {
        self.running_max
    }

    /// Rounds completed.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn frontier(&self) -> &[StateVector] {
        &self.frontier
    }

    pub fn history(&self) -> &[GrowthRecord] {
        &self.history
    }

    pub fn registry(&self) -> &dyn StateRegistry {
        self.registry.as_ref()
    }

    /// Run one round and return the resulting phase.
    pub fn step(&mut self, recorder: &mut Recorder) -> Result<SearchPhase, SearchError> {
        if self.phase.is_terminal() {
            return Ok(self.phase);
        }
        if self.iteration >= self.config.max_iterations {
            warn!("Max iterations reached ({})", self.config.max_iterations);
            self.phase = SearchPhase::BudgetExhausted;
            return Ok(self.phase);
        }

        let outcome = match self
            .scheduler
            .expand_round(&self.frontier, self.registry.as_ref())
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Round {} aborted: {}", self.iteration, e);
                self.phase = SearchPhase::Fatal;
                return Err(e.into());
            }
        };

        self.proposed += outcome.proposed as u64;
        self.duplicates += outcome.duplicates as u64;

        if let Err(e) = self.observe(&outcome.confirmed, recorder) {
            self.phase = SearchPhase::Fatal;
            return Err(e.into());
        }

        debug!(
            "Round {}: frontier={} proposed={} duplicates={} confirmed={} seen={}",
            self.iteration,
            self.frontier.len(),
            outcome.proposed,
            outcome.duplicates,
            outcome.confirmed.len(),
            self.registry.len()
        );

        if outcome.is_empty() {
            info!("Converged after {} rounds", self.iteration + 1);
            self.frontier.clear();
            self.iteration += 1;
            self.phase = SearchPhase::Converged;
            return Ok(self.phase);
        }

        self.frontier = outcome.into_frontier();
        self.iteration += 1;
        if self.iteration >= self.config.max_iterations {
            warn!("Max iterations reached ({})", self.config.max_iterations);
            self.phase = SearchPhase::BudgetExhausted;
        }
        Ok(self.phase)
    }

    /// Update the running maximum and emit rows for the confirmed states.
    fn observe(
        &mut self,
        confirmed: &[Confirmed],
        recorder: &mut Recorder,
    ) -> Result<(), SinkError> {
        recorder.record_round(confirmed)?;

        for entry in confirmed {
            let max = entry.state.max_coordinate();
            if max > self.running_max {
                self.running_max = max;
                let record = GrowthRecord {
                    new_max: max,
                    iteration: self.iteration,
                };
                info!("New max {} at iteration {}", max, self.iteration);
                recorder.record_growth(&record)?;
                self.history.push(record);
            }
        }
        Ok(())
    }

    /// Current progress snapshot.
    pub fn progress(&self, confirmed: usize) -> SearchProgress {
        SearchProgress {
            rounds: self.iteration,
            confirmed,
            frontier: self.frontier.len(),
            states_seen: self.registry.len(),
            running_max: self.running_max,
            phase: self.phase,
        }
    }

    /// Run until convergence or the iteration cap, reporting after each round.
    ///
    /// The first call writes the recorder's headers and roots. Calling again
    /// after a stop returns the same outcome without writing anything; the
    /// recorder is never closed here.
    pub fn run_with_callback<F>(
        &mut self,
        recorder: &mut Recorder,
        callback: F,
    ) -> Result<SearchResult, SearchError>
    where
        F: Fn(&SearchProgress),
    {
        let start_time = Instant::now();

        let stop_reason = match self.phase {
            SearchPhase::Fatal => return Err(SearchError::Aborted),
            SearchPhase::Converged => Some(StopReason::Converged),
            SearchPhase::BudgetExhausted => Some(StopReason::BudgetExhausted),
            SearchPhase::Running => None,
        };
        if let Some(stop_reason) = stop_reason {
            return Ok(self.result(stop_reason, 0.0));
        }

        if !self.begun {
            recorder.begin(&self.frontier)?;
            self.begun = true;
        }

        let stop_reason = loop {
            let seen_before = self.registry.len();
            let phase = self.step(recorder)?;
            callback(&self.progress(self.registry.len() - seen_before));

            match phase {
                SearchPhase::Running => {}
                SearchPhase::Converged => break StopReason::Converged,
                SearchPhase::BudgetExhausted => break StopReason::BudgetExhausted,
                SearchPhase::Fatal => return Err(SearchError::Aborted),
            }
        };

        Ok(self.result(stop_reason, start_time.elapsed().as_secs_f64()))
    }

    fn result(&self, stop_reason: StopReason, elapsed: f64) -> SearchResult {
        let states_seen = self.registry.len();

        SearchResult {
            running_max: self.running_max,
            history: self.history.clone(),
            stats: SearchStats {
                rounds: self.iteration,
                states_seen,
                proposed: self.proposed,
                duplicates: self.duplicates,
                elapsed_seconds: elapsed,
                states_per_second: if elapsed > 0.0 {
                    states_seen as f64 / elapsed
                } else {
                    0.0
                },
                stop_reason,
            },
        }
    }

    /// Run until convergence or the iteration cap.
    pub fn run(&mut self, recorder: &mut Recorder) -> Result<SearchResult, SearchError> {
        self.run_with_callback(recorder, |_| {})
    }
}

/// Open the CSV sinks named by `config`.
pub fn open_recorder(config: &SearchConfig) -> Result<Recorder, SearchError> {
    let open = |path: PathBuf| {
        CsvSink::create(&path).map_err(|source| SearchError::Open { path, source })
    };

    let mut recorder = Recorder::new(Box::new(open(config.growth_path())?));
    if config.output.provenance {
        let ids = match config.output.id_seed {
            Some(seed) => RandomIds::new(seed),
            None => RandomIds::random(),
        };
        recorder = recorder.with_lineage(Box::new(open(config.lineage_path())?), Box::new(ids));
    }
    Ok(recorder)
}

/// Run a full search with CSV output, closing every sink on every exit path.
pub fn run_search<F>(config: SearchConfig, callback: F) -> Result<SearchResult, SearchError>
where
    F: Fn(&SearchProgress),
{
    config.validate()?;
    let mut recorder = open_recorder(&config)?;
    let outcome = run_recorded(config, &mut recorder, callback);
    let closed = recorder.close();

    match outcome {
        Ok(result) => {
            closed?;
            Ok(result)
        }
        Err(e) => {
            if let Err(close_err) = closed {
                warn!("Failed to close output after error: {}", close_err);
            }
            Err(e)
        }
    }
}

fn run_recorded<F>(
    config: SearchConfig,
    recorder: &mut Recorder,
    callback: F,
) -> Result<SearchResult, SearchError>
where
    F: Fn(&SearchProgress),
{
    SearchLoop::new(config)?.run_with_callback(recorder, callback)
}
