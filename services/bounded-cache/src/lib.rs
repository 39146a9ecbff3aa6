//! Bounded in-process cache with TTL expiry and approximate-LRU eviction.
//!
//! Generic key→value store used to memoize recent analysis results.
//! Entries expire at an absolute deadline; when the store is at
//! capacity a new insert evicts the least-accessed entry first. A
//! background sweeper can be spawned to proactively drop expired
//! entries so memory stays bounded even for keys nobody re-reads.
//!
//! The cache is best-effort: absence is a normal outcome, never an
//! error, and callers must treat a miss as "not yet computed".

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache sizing and expiry configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries before eviction kicks in
    pub max_size: usize,
    /// TTL applied when `set` is called without an explicit one
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Serializable counter snapshot exposed via [`Cache::stats`]
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    pub expired_removed: u64,
    pub sweeps: u64,
    pub size: usize,
    pub max_size: usize,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
    access_count: u64,
    /// Insertion sequence, used as the eviction tie-breaker
    seq: u64,
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    sets: u64,
    evictions: u64,
    expired_removed: u64,
    sweeps: u64,
}

struct CacheInner<K, V> {
    entries: HashMap<K, Entry<V>>,
    counters: Counters,
    next_seq: u64,
    max_size: usize,
    default_ttl: Duration,
}

impl<K: Hash + Eq + Clone, V: Clone> CacheInner<K, V> {
    /// Evict the least-accessed entry (ties broken by insertion order).
    ///
    /// Access counts approximate LRU: the goal is bounding memory,
    /// not strict recency.
    fn evict_one(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.access_count, e.seq))
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.counters.evictions += 1;
        }
    }

    fn insert(&mut self, key: K, value: V, ttl: Duration, now: Instant) {
        // Replacing an existing key never needs an eviction
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_one();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
                access_count: 0,
                seq,
            },
        );
        self.counters.sets += 1;
    }
}

/// Bounded TTL cache, safe for concurrent callers.
///
/// All operations take a single interior lock for the duration of one
/// map access; no operation blocks on I/O.
pub struct Cache<K, V> {
    inner: Mutex<CacheInner<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> Cache<K, V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                counters: Counters::default(),
                next_seq: 0,
                max_size: config.max_size.max(1),
                default_ttl: config.default_ttl,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner<K, V>> {
        // A poisoned lock only means another caller panicked mid-op;
        // the map itself is still a valid cache.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a value, evicting one entry first if at capacity.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut inner = self.lock();
        let ttl = ttl.unwrap_or(inner.default_ttl);
        inner.insert(key, value, ttl, now);
    }

    /// Fetch a fresh value, lazily deleting it if expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();
        match inner.entries.get_mut(key) {
            Some(entry) if entry.is_fresh(now) => {
                entry.access_count += 1;
                let value = entry.value.clone();
                inner.counters.hits += 1;
                Some(value)
            }
            Some(_) => {
                inner.entries.remove(key);
                inner.counters.expired_removed += 1;
                inner.counters.misses += 1;
                None
            }
            None => {
                inner.counters.misses += 1;
                None
            }
        }
    }

    /// Freshness check that does not touch access counts.
    pub fn has(&self, key: &K) -> bool {
        let now = Instant::now();
        let mut inner = self.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => true,
            Some(_) => {
                inner.entries.remove(key);
                inner.counters.expired_removed += 1;
                false
            }
            None => false,
        }
    }

    /// Remove a key unconditionally. Returns whether it was present.
    pub fn delete(&self, key: &K) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Batch get; each slot is the same as an individual [`Cache::get`].
    pub fn mget(&self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    /// Batch set with one TTL for every pair.
    pub fn mset(&self, pairs: Vec<(K, V)>, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut inner = self.lock();
        let ttl = ttl.unwrap_or(inner.default_ttl);
        for (key, value) in pairs {
            inner.insert(key, value, ttl, now);
        }
    }

    /// Reset the expiry deadline of a fresh entry.
    pub fn update_ttl(&self, key: &K, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut inner = self.lock();
        match inner.entries.get_mut(key) {
            Some(entry) if entry.is_fresh(now) => {
                entry.expires_at = now + ttl;
                true
            }
            _ => false,
        }
    }

    /// Time left before a fresh entry expires.
    pub fn remaining_ttl(&self, key: &K) -> Option<Duration> {
        let now = Instant::now();
        let inner = self.lock();
        inner
            .entries
            .get(key)
            .filter(|e| e.is_fresh(now))
            .map(|e| e.expires_at - now)
    }

    /// One sweep pass: remove every expired entry. Returns how many
    /// were dropped. Holds the lock for a single retain only.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.is_fresh(now));
        let removed = before - inner.entries.len();
        inner.counters.expired_removed += removed as u64;
        inner.counters.sweeps += 1;
        removed
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.counters.hits,
            misses: inner.counters.misses,
            sets: inner.counters.sets,
            evictions: inner.counters.evictions,
            expired_removed: inner.counters.expired_removed,
            sweeps: inner.counters.sweeps,
            size: inner.entries.len(),
            max_size: inner.max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shrink or grow the capacity at runtime, evicting down if needed.
    pub fn set_max_size(&self, max_size: usize) {
        let mut inner = self.lock();
        inner.max_size = max_size.max(1);
        while inner.entries.len() > inner.max_size {
            inner.evict_one();
        }
    }

    /// Change the TTL applied to future sets without an explicit one.
    pub fn set_default_ttl(&self, ttl: Duration) {
        self.lock().default_ttl = ttl;
    }
}

impl<K: Hash + Eq + Clone, V: Clone> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Spawn a background task sweeping the cache on a fixed interval,
/// independent of get/set traffic.
pub fn spawn_sweeper<K, V>(cache: Arc<Cache<K, V>>, every: Duration) -> tokio::task::JoinHandle<()>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // First tick fires immediately; skip it so the cadence is clean
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = cache.cleanup();
            if removed > 0 {
                debug!("cache sweep: removed {} expired entries", removed);
            }
        }
    })
}
