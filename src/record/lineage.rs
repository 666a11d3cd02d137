//! Identifier generation for discovery lineage.

use rand::prelude::*;

/// Source of run-unique opaque identifiers.
pub trait IdGenerator: Send {
    fn new_id(&mut self) -> String;
}

/// 128-bit random identifiers rendered as hex.
pub struct RandomIds {
    rng: StdRng,
}

impl RandomIds {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl IdGenerator for RandomIds {
    fn new_id(&mut self) -> String {
        format!("{:032x}", self.rng.r#gen::<u128>())
    }
}

/// Identifiers `0, 1, 2, ...`.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn new_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_ids_unique() {
        let mut ids = RandomIds::new(7);
        let generated: HashSet<String> = (0..1000).map(|_| ids.new_id()).collect();
        assert_eq!(generated.len(), 1000);
        assert!(generated.iter().all(|id| id.len() == 32));
    }

    #[test]
    fn test_random_ids_reproducible() {
        let mut a = RandomIds::new(42);
        let mut b = RandomIds::new(42);
        assert_eq!(a.new_id(), b.new_id());
    }

    #[test]
    fn test_sequential_ids() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.new_id(), "0");
        assert_eq!(ids.new_id(), "1");
    }
}
