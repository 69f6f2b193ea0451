//! Seen-line sets
//!
//! The set of every line accepted so far, shared by all pipeline workers.
//! The only mutation exposed is [`SeenSet::check_and_insert`], which tests
//! and inserts under a single write lock, so a given line is accepted at
//! most once no matter how many callers race on it.
//!
//! - Memory: one `RwLock`-guarded `HashSet` (single worker)
//! - Sharded: `RwLock`-guarded shards selected by hash (many workers)

use ahash::RandomState;
use hashbrown::HashSet;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::{PoisonError, RwLock};

/// Concurrency-safe set of seen lines
pub trait SeenSet: Send + Sync {
    /// Atomically mark `line` as seen.
    ///
    /// Returns true iff the line was not present before this call.
    fn check_and_insert(&self, line: &[u8]) -> bool;

    /// Get the number of distinct lines
    fn len(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Shard = RwLock<HashSet<Vec<u8>, RandomState>>;

fn insert_into(shard: &Shard, line: &[u8]) -> bool {
    let mut set = shard.write().unwrap_or_else(PoisonError::into_inner);
    if set.contains(line) {
        return false;
    }
    set.insert(line.to_vec())
}

fn shard_len(shard: &Shard) -> usize {
    shard.read().unwrap_or_else(PoisonError::into_inner).len()
}

/// In-memory HashSet behind a single lock
pub struct MemorySeenSet {
    set: Shard,
}

impl MemorySeenSet {
    pub fn new() -> Self {
        Self {
            set: RwLock::new(HashSet::with_hasher(RandomState::new())),
        }
    }
}

impl Default for MemorySeenSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SeenSet for MemorySeenSet {
    fn check_and_insert(&self, line: &[u8]) -> bool {
        insert_into(&self.set, line)
    }

    fn len(&self) -> usize {
        shard_len(&self.set)
    }
}

/// Sharded set for lower lock contention across workers.
///
/// A line always hashes to the same shard, so per-shard atomicity is
/// enough for the whole set.
pub struct ShardedSeenSet {
    shards: Vec<Shard>,
    hasher: RandomState,
}

impl ShardedSeenSet {
    pub fn new(num_shards: usize) -> Self {
        let shards = (0..num_shards.max(1))
            .map(|_| RwLock::new(HashSet::with_hasher(RandomState::new())))
            .collect();

        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    fn shard_for(&self, line: &[u8]) -> &Shard {
        let mut hasher = self.hasher.build_hasher();
        line.hash(&mut hasher);
        let idx = hasher.finish() as usize % self.shards.len();
        &self.shards[idx]
    }
}

impl SeenSet for ShardedSeenSet {
    fn check_and_insert(&self, line: &[u8]) -> bool {
        insert_into(self.shard_for(line), line)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(shard_len).sum()
    }
}

/// Pick a set implementation for the given worker count
pub fn create_seen_set(workers: usize) -> Box<dyn SeenSet> {
    if workers <= 1 {
        Box::new(MemorySeenSet::new())
    } else {
        Box::new(ShardedSeenSet::new(num_cpus::get() * 4))
    }
}
