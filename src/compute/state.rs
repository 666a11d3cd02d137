//! State vectors and their canonical form.
//!
//! The search runs over permutation classes: two vectors that are
//! rearrangements of each other are the same state. The sorted vector is
//! the representative of its class, and its positional polynomial hash is
//! the bucket key used by the seen registry.

use std::fmt;

use crate::schema::Coord;

/// Bucket key of a canonical state. Equal digests do not imply equal states.
pub type Digest = i64;

/// Fixed-length tuple of bounded signed integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateVector(Vec<Coord>);

impl StateVector {
    /// Wrap raw coordinates without reordering them.
    pub fn new(coords: Vec<Coord>) -> Self {
        Self(coords)
    }

    /// The all-zero state of dimension `n`.
    pub fn zeros(n: usize) -> Self {
        Self(vec![0; n])
    }

    /// Coordinates in storage order.
    #[inline]
    pub fn coords(&self) -> &[Coord] {
        &self.0
    }

    /// Number of coordinates.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Sort in place into canonical form.
    #[inline]
    pub fn into_canonical(mut self) -> Self {
        self.0.sort_unstable();
        self
    }

    /// Whether coordinates are already in ascending order.
    pub fn is_canonical(&self) -> bool {
        self.0.windows(2).all(|w| w[0] <= w[1])
    }

    /// Largest coordinate, or 0 for an empty vector.
    pub fn max_coordinate(&self) -> Coord {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Canonical form of the coordinate-wise negation.
    ///
    /// Negating a sorted vector reverses its order, so no sort is needed.
    pub fn negated(&self) -> Self {
        let mut coords: Vec<Coord> = self.0.iter().map(|&c| -c).collect();
        if self.is_canonical() {
            coords.reverse();
        } else {
            coords.sort_unstable();
        }
        Self(coords)
    }

    /// Positional polynomial hash over the coordinates in storage order.
    #[inline]
    pub fn digest(&self) -> Digest {
        self.0
            .iter()
            .fold(0, |hash: Digest, &c| hash.wrapping_mul(31).wrapping_add(c as Digest))
    }
}

impl From<Vec<Coord>> for StateVector {
    fn from(coords: Vec<Coord>) -> Self {
        Self(coords)
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "]")
    }
}

/// Canonical representative of `v`'s permutation class (ascending order).
pub fn canonicalize(v: &StateVector) -> StateVector {
    v.clone().into_canonical()
}

/// Bucket key of `v`. Callers pass the canonical form so permutations collide.
pub fn digest(v: &StateVector) -> Digest {
    v.digest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonicalize_sorts() {
        let v = StateVector::new(vec![3, -1, 2]);
        assert_eq!(canonicalize(&v), StateVector::new(vec![-1, 2, 3]));
        assert!(canonicalize(&v).is_canonical());
        assert!(!v.is_canonical());
    }

    #[test]
    fn test_digest_positional() {
        // ((0 * 31 + 1) * 31 + 2) * 31 + 3
        let v = StateVector::new(vec![1, 2, 3]);
        assert_eq!(digest(&v), 31 * 31 + 2 * 31 + 3);
        assert_eq!(digest(&StateVector::zeros(4)), 0);
    }

    #[test]
    fn test_digest_collision_exists() {
        // 0 * 31 + 31 == -1 * 31 + 62, both canonical.
        let a = StateVector::new(vec![0, 31]);
        let b = StateVector::new(vec![-1, 62]);
        assert!(a.is_canonical() && b.is_canonical());
        assert_eq!(digest(&a), 31);
        assert_eq!(digest(&a), digest(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_negated_is_canonical() {
        let v = StateVector::new(vec![-2, 0, 5]);
        assert_eq!(v.negated(), StateVector::new(vec![-5, 0, 2]));

        let unsorted = StateVector::new(vec![5, -2, 0]);
        assert_eq!(unsorted.negated(), StateVector::new(vec![-5, 0, 2]));
    }

    #[test]
    fn test_max_coordinate() {
        assert_eq!(StateVector::new(vec![-4, 1, 3]).max_coordinate(), 3);
        assert_eq!(StateVector::new(vec![-4, -2]).max_coordinate(), -2);
    }

    #[test]
    fn test_display() {
        assert_eq!(StateVector::new(vec![-1, 0, 2]).to_string(), "[-1 0 2]");
        assert_eq!(StateVector::new(vec![]).to_string(), "[]");
    }

    proptest! {
        #[test]
        fn canonicalize_is_idempotent(coords in prop::collection::vec(-100i32..100, 1..8)) {
            let v = StateVector::new(coords);
            let once = canonicalize(&v);
            prop_assert_eq!(canonicalize(&once), once);
        }

        #[test]
        fn canonicalize_ignores_permutation(
            coords in prop::collection::vec(-100i32..100, 1..8),
            rotation in 0usize..8,
        ) {
            let mut permuted = coords.clone();
            permuted.reverse();
            let len = permuted.len();
            permuted.rotate_left(rotation % len);

            let a = canonicalize(&StateVector::new(coords));
            let b = canonicalize(&StateVector::new(permuted));
            prop_assert_eq!(digest(&a), digest(&b));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn negation_is_an_involution(coords in prop::collection::vec(-100i32..100, 1..8)) {
            let v = canonicalize(&StateVector::new(coords));
            prop_assert_eq!(v.negated().negated(), v);
        }
    }
}
