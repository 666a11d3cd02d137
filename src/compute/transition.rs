//! One-step successor enumeration.
//!
//! For every non-empty subset of coordinate indices, the subset sum picks
//! the move: a negative sum increments every coordinate in the subset, a
//! positive sum decrements them, and a zero sum allows the increment and
//! (under [`ZeroSumPolicy::Both`]) the decrement. Every successor is
//! canonicalized before it is returned.

use std::collections::HashSet;

use super::registry::StateRegistry;
use super::state::StateVector;
use crate::schema::{Coord, CoordinateBounds, SearchConfig, ZeroSumPolicy};

/// A proposed coordinate reached the configured bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Coordinate overflow: value {value} reached bound {bound} while expanding {state}")]
pub struct OverflowError {
    /// The offending coordinate value.
    pub value: i64,
    /// The bound it reached.
    pub bound: Coord,
    /// The state being expanded.
    pub state: StateVector,
}

/// Enumerates successors of a single state.
#[derive(Debug, Clone, Copy)]
pub struct TransitionEngine {
    bounds: CoordinateBounds,
    zero_sum: ZeroSumPolicy,
    check_negation: bool,
}

impl TransitionEngine {
    pub fn new(bounds: CoordinateBounds, zero_sum: ZeroSumPolicy) -> Self {
        Self {
            bounds,
            zero_sum,
            check_negation: false,
        }
    }

    /// Also bounds-check the negation of every successor.
    ///
    /// Needed when the confirm phase registers mirrored states, so that an
    /// out-of-range mirror aborts the round before anything is inserted.
    pub fn with_negation_check(mut self, enabled: bool) -> Self {
        self.check_negation = enabled;
        self
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.bounds, config.zero_sum).with_negation_check(config.negation_symmetry)
    }

    pub fn bounds(&self) -> CoordinateBounds {
        self.bounds
    }

    pub fn zero_sum(&self) -> ZeroSumPolicy {
        self.zero_sum
    }

    /// All canonical successors of `state`, in subset order, without duplicates.
    pub fn successors(&self, state: &StateVector) -> Result<Vec<StateVector>, OverflowError> {
        let n = state.dimension();
        let coords = state.coords();
        let capacity = 2 * ((1usize << n) - 1);
        let mut out: Vec<StateVector> = Vec::with_capacity(capacity);
        let mut emitted: HashSet<StateVector> = HashSet::with_capacity(capacity);

        for mask in 1u32..(1u32 << n) {
            let sum: i64 = (0..n)
                .filter(|&j| mask & (1 << j) != 0)
                .map(|j| coords[j] as i64)
                .sum();

            if sum <= 0 {
                push_unique(&mut out, &mut emitted, self.step(state, mask, 1)?);
            }
            if sum > 0 || (sum == 0 && self.zero_sum == ZeroSumPolicy::Both) {
                push_unique(&mut out, &mut emitted, self.step(state, mask, -1)?);
            }
        }

        Ok(out)
    }

    /// Successors not yet present in `registry`.
    ///
    /// The registry check is advisory: another worker may propose the same
    /// state in the same round. The confirm phase is authoritative.
    pub fn expand(
        &self,
        state: &StateVector,
        registry: &dyn StateRegistry,
    ) -> Result<Vec<StateVector>, OverflowError> {
        let mut candidates = self.successors(state)?;
        candidates.retain(|candidate| !registry.contains(candidate));
        Ok(candidates)
    }

    /// Apply `delta` to every coordinate selected by `mask`, then canonicalize.
    fn step(&self, state: &StateVector, mask: u32, delta: i64) -> Result<StateVector, OverflowError> {
        let mut next = Vec::with_capacity(state.dimension());
        for (j, &c) in state.coords().iter().enumerate() {
            let value = if mask & (1 << j) != 0 {
                c as i64 + delta
            } else {
                c as i64
            };
            self.check(value, state)?;
            if self.check_negation {
                self.check(-value, state)?;
            }
            next.push(value as Coord);
        }
        Ok(StateVector::new(next).into_canonical())
    }

    #[inline]
    fn check(&self, value: i64, state: &StateVector) -> Result<(), OverflowError> {
        match self.bounds.violated_by(value) {
            None => Ok(()),
            Some(bound) => Err(OverflowError {
                value,
                bound,
                state: state.clone(),
            }),
        }
    }
}

/// Append `candidate` unless an equal state was already emitted.
#[inline]
fn push_unique(
    out: &mut Vec<StateVector>,
    emitted: &mut HashSet<StateVector>,
    candidate: StateVector,
) {
    if emitted.insert(candidate.clone()) {
        out.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::registry::SeenRegistry;

    fn sv(coords: &[i32]) -> StateVector {
        StateVector::new(coords.to_vec())
    }

    fn engine(zero_sum: ZeroSumPolicy) -> TransitionEngine {
        TransitionEngine::new(CoordinateBounds::default(), zero_sum)
    }

    #[test]
    fn test_successors_unique_at_high_dimension() {
        // Every subset of zeros maps onto one of 2n sorted vectors.
        let n = 12;
        let out = engine(ZeroSumPolicy::Both)
            .successors(&StateVector::zeros(n))
            .unwrap();
        assert_eq!(out.len(), 2 * n);

        let distinct: HashSet<&StateVector> = out.iter().collect();
        assert_eq!(distinct.len(), out.len());

        // First appearance order: one incremented, one decremented.
        let mut first_up = vec![0; n];
        first_up[n - 1] = 1;
        let mut first_down = vec![0; n];
        first_down[0] = -1;
        assert_eq!(out[0], StateVector::new(first_up));
        assert_eq!(out[1], StateVector::new(first_down));
    }

    #[test]
    fn test_successors_unique_mixed_state() {
        let state = sv(&[-3, -1, 0, 0, 1, 2, 2, 4]);
        let out = engine(ZeroSumPolicy::Both).successors(&state).unwrap();
        let distinct: HashSet<&StateVector> = out.iter().collect();
        assert_eq!(distinct.len(), out.len());
        assert!(out.iter().all(StateVector::is_canonical));
    }

    #[test]
    fn test_two_dimensional_origin() {
        // {0}: sum 0 -> (1,0)=(0,1) and (-1,0)
        // {1}: same classes as {0}
        // {0,1}: sum 0 -> (1,1) and (-1,-1)
        let successors = engine(ZeroSumPolicy::Both)
            .successors(&sv(&[0, 0]))
            .unwrap();
        assert_eq!(
            successors,
            vec![sv(&[0, 1]), sv(&[-1, 0]), sv(&[1, 1]), sv(&[-1, -1])]
        );
    }

    #[test]
    fn test_increment_only_zero_sum() {
        let successors = engine(ZeroSumPolicy::IncrementOnly)
            .successors(&sv(&[0, 0]))
            .unwrap();
        assert_eq!(successors, vec![sv(&[0, 1]), sv(&[1, 1])]);
    }

    #[test]
    fn test_signed_sums_move_toward_zero() {
        // {0}: -1 < 0 -> (0,1); {1}: 1 > 0 -> (-1,0); {0,1}: 0 -> (0,2), (-2,0)
        let successors = engine(ZeroSumPolicy::Both)
            .successors(&sv(&[-1, 1]))
            .unwrap();
        assert_eq!(
            successors,
            vec![sv(&[0, 1]), sv(&[-1, 0]), sv(&[0, 2]), sv(&[-2, 0])]
        );
    }

    #[test]
    fn test_successors_are_canonical() {
        let successors = engine(ZeroSumPolicy::Both)
            .successors(&sv(&[-3, -1, 0, 2, 4]))
            .unwrap();
        assert!(!successors.is_empty());
        assert!(successors.iter().all(StateVector::is_canonical));
        assert!(successors.iter().all(|s| s.dimension() == 5));
    }

    #[test]
    fn test_expand_filters_seen() {
        let registry = SeenRegistry::new();
        registry.insert(sv(&[0, 1]));
        registry.insert(sv(&[-1, -1]));

        let fresh = engine(ZeroSumPolicy::Both)
            .expand(&sv(&[0, 0]), &registry)
            .unwrap();
        assert_eq!(fresh, vec![sv(&[-1, 0]), sv(&[1, 1])]);
    }

    #[test]
    fn test_overflow_detected() {
        let engine = TransitionEngine::new(
            CoordinateBounds { min: -3, max: 3 },
            ZeroSumPolicy::Both,
        );
        // {0,1} sums to zero and increments 2 to 3.
        let err = engine.successors(&sv(&[-2, 2])).unwrap_err();
        assert_eq!(err.value, 3);
        assert_eq!(err.bound, 3);
        assert_eq!(err.state, sv(&[-2, 2]));
        assert!(err.to_string().contains("[-2 2]"));
    }

    #[test]
    fn test_negation_check() {
        // Asymmetric bounds: 2 is admissible, its negation -2 is not.
        let bounds = CoordinateBounds { min: -2, max: 4 };
        let state = sv(&[-1, 1]);

        let plain = TransitionEngine::new(bounds, ZeroSumPolicy::IncrementOnly);
        assert_eq!(
            plain.successors(&state).unwrap(),
            vec![sv(&[0, 1]), sv(&[-1, 0]), sv(&[0, 2])]
        );

        let mirrored = plain.with_negation_check(true);
        let err = mirrored.successors(&state).unwrap_err();
        assert_eq!(err.bound, -2);
    }
}
