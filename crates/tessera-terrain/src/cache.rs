//! Bounded in-memory chunk cache keyed by [`ChunkKey`].
//!
//! A single mutex guards the map, the eviction order and the counters, so a
//! lookup, an insertion and the eviction it triggers are one atomic step.
//! The cache is advisory: a miss only costs a regeneration.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use tessera_config::CachePolicy;

use crate::chunk::{Chunk, ChunkKey};

/// Which entry to evict when the cache is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Oldest insertion first; lookups do not affect order.
    InsertionOrder,
    /// Least recently inserted or looked up first.
    #[default]
    LeastRecentlyUsed,
}

impl From<CachePolicy> for EvictionPolicy {
    fn from(policy: CachePolicy) -> Self {
        match policy {
            CachePolicy::InsertionOrder => EvictionPolicy::InsertionOrder,
            CachePolicy::LeastRecentlyUsed => EvictionPolicy::LeastRecentlyUsed,
        }
    }
}

/// Counters and occupancy at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, or `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct Entry {
    chunk: Arc<Chunk>,
    tick: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: FxHashMap<ChunkKey, Entry>,
    /// Tick to key; the first entry is the next eviction candidate.
    order: BTreeMap<u64, ChunkKey>,
    next_tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn remove(&mut self, key: &ChunkKey) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.tick);
        Some(entry)
    }
}

/// Bounded store of generated chunks.
#[derive(Debug)]
pub struct ChunkCache {
    capacity: usize,
    policy: EvictionPolicy,
    inner: Mutex<Inner>,
}

impl ChunkCache {
    /// Cache holding at most `capacity` chunks. Capacity 0 stores nothing.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            capacity,
            policy,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a chunk.
    pub fn get(&self, key: &ChunkKey) -> Option<Arc<Chunk>> {
        self.get_where(key, |_| true)
    }

    /// Look up a chunk, treating it as absent unless `accept` holds.
    ///
    /// A rejected entry counts as a miss and is dropped from the cache.
    pub fn get_where(
        &self,
        key: &ChunkKey,
        accept: impl FnOnce(&Chunk) -> bool,
    ) -> Option<Arc<Chunk>> {
        let mut inner = self.lock();
        let found = inner
            .entries
            .get(key)
            .map(|entry| (accept(&entry.chunk), Arc::clone(&entry.chunk), entry.tick));
        let chunk = match found {
            Some((true, chunk, old_tick)) => {
                if self.policy == EvictionPolicy::LeastRecentlyUsed {
                    let tick = inner.tick();
                    inner.order.remove(&old_tick);
                    inner.order.insert(tick, *key);
                    if let Some(entry) = inner.entries.get_mut(key) {
                        entry.tick = tick;
                    }
                }
                chunk
            }
            Some((false, ..)) => {
                inner.remove(key);
                inner.misses += 1;
                return None;
            }
            None => {
                inner.misses += 1;
                return None;
            }
        };
        inner.hits += 1;
        Some(chunk)
    }

    /// Insert a chunk under its own key.
    ///
    /// Replacing an existing key never evicts. Returns the key evicted to
    /// make room, if any.
    pub fn put(&self, chunk: Arc<Chunk>) -> Option<ChunkKey> {
        if self.capacity == 0 {
            return None;
        }
        let key = chunk.key();
        let mut inner = self.lock();

        let replaced = inner.remove(&key).is_some();
        let evicted = if !replaced && inner.entries.len() >= self.capacity {
            let victim = inner.order.first_key_value().map(|(_, key)| *key);
            if let Some(victim) = victim {
                inner.remove(&victim);
                inner.evictions += 1;
                tracing::trace!(x = victim.x, z = victim.z, size = victim.size, "Evicted chunk");
            }
            victim
        } else {
            None
        };

        let tick = inner.tick();
        inner.order.insert(tick, key);
        inner.entries.insert(key, Entry { chunk, tick });
        evicted
    }

    /// Remove one chunk.
    pub fn remove(&self, key: &ChunkKey) -> Option<Arc<Chunk>> {
        self.lock().remove(key).map(|entry| entry.chunk)
    }

    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every chunk. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            len: inner.entries.len(),
            capacity: self.capacity,
        }
    }
}
