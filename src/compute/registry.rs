//! Seen-state registries.
//!
//! A registry maps digests to the canonical states sharing that digest.
//! Membership is a bucket lookup followed by a linear equality scan, so
//! digest collisions are resolved by comparing full vectors. Entries are
//! never removed.
//!
//! `contains` takes a shared lock and may run from any number of workers at
//! once. `insert` takes the write lock and checks for presence under it, so
//! a state is reported as newly inserted exactly once.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::state::{Digest, StateVector};
use crate::schema::RegistryKind;

/// Insert/contains capability over canonical states.
pub trait StateRegistry: Send + Sync {
    /// True iff an equal canonical state was previously inserted.
    fn contains(&self, state: &StateVector) -> bool;

    /// Insert if absent. Returns true if the state was newly inserted.
    fn insert(&self, state: StateVector) -> bool;

    /// Number of distinct states inserted.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the registry selected by configuration.
pub fn build_registry(kind: RegistryKind) -> Box<dyn StateRegistry> {
    match kind {
        RegistryKind::Single => Box::new(SeenRegistry::new()),
        RegistryKind::Striped { shards } => Box::new(StripedRegistry::new(shards)),
    }
}

type Buckets = HashMap<Digest, Vec<StateVector>>;

fn bucket_contains(buckets: &Buckets, digest: Digest, state: &StateVector) -> bool {
    buckets
        .get(&digest)
        .is_some_and(|bucket| bucket.iter().any(|seen| seen == state))
}

fn bucket_insert(buckets: &mut Buckets, digest: Digest, state: StateVector) -> bool {
    let bucket = buckets.entry(digest).or_default();
    if bucket.iter().any(|seen| *seen == state) {
        return false;
    }
    bucket.push(state);
    true
}

/// Digest-bucketed registry behind a single reader-writer lock.
#[derive(Debug, Default)]
pub struct SeenRegistry {
    buckets: RwLock<Buckets>,
    len: AtomicUsize,
}

impl SeenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// States stored under `digest`, in insertion order.
    pub fn bucket(&self, digest: Digest) -> Vec<StateVector> {
        self.buckets
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&digest)
            .cloned()
            .unwrap_or_default()
    }
}

impl StateRegistry for SeenRegistry {
    fn contains(&self, state: &StateVector) -> bool {
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        bucket_contains(&buckets, state.digest(), state)
    }

    fn insert(&self, state: StateVector) -> bool {
        let digest = state.digest();
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let inserted = bucket_insert(&mut buckets, digest, state);
        if inserted {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
        inserted
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

/// Registry split into digest-addressed shards with one lock each.
///
/// Readers and writers touching different shards never contend.
#[derive(Debug)]
pub struct StripedRegistry {
    shards: Vec<RwLock<Buckets>>,
    len: AtomicUsize,
}

impl StripedRegistry {
    /// Create with `shards` stripes (at least one).
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| RwLock::new(HashMap::new())).collect(),
            len: AtomicUsize::new(0),
        }
    }

    /// Number of stripes.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard(&self, digest: Digest) -> &RwLock<Buckets> {
        let index = (digest as u64 % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}

impl StateRegistry for StripedRegistry {
    fn contains(&self, state: &StateVector) -> bool {
        let digest = state.digest();
        let shard = self.shard(digest).read().unwrap_or_else(|e| e.into_inner());
        bucket_contains(&shard, digest, state)
    }

    fn insert(&self, state: StateVector) -> bool {
        let digest = state.digest();
        let mut shard = self.shard(digest).write().unwrap_or_else(|e| e.into_inner());
        let inserted = bucket_insert(&mut shard, digest, state);
        if inserted {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
        inserted
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}
