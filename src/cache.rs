//! TTL- and capacity-bounded in-memory result cache.
//!
//! Entries are keyed by string and expire lazily: a read past `expires_at`
//! removes the entry and reports a miss, whether or not a sweep has run.
//! [`ResultCache::cleanup`] removes every expired entry in one pass and can be
//! driven by a timer with [`ResultCache::spawn_sweeper`].
//!
//! # Eviction order
//!
//! When a new key is inserted into a full cache, exactly one entry is evicted:
//! the one with the oldest `written_at`, i.e. the earliest *write*. Reads do
//! not refresh an entry's position, so this is write-order (FIFO) eviction and
//! not LRU. This is intentional and callers may rely on it.
//!
//! # Example
//!
//! ```ignore
//! let cache: ResultCache<String> = ResultCache::new(CacheConfig::default());
//! cache.set("mainnet:0x2::coin", "...".to_string());
//! assert!(cache.has("mainnet:0x2::coin"));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Longest TTL honored; longer ones are clamped so `now + ttl` cannot overflow.
pub const MAX_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Shortest sweep period accepted by [`ResultCache::spawn_sweeper`].
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Sizing and expiry for a [`ResultCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Default time-to-live for entries written with [`ResultCache::set`].
    /// Values above [`MAX_TTL`] are treated as `MAX_TTL`.
    pub ttl: Duration,
    /// Upper bound on live entries; values below 1 are treated as 1.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 1000,
        }
    }
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Debug)]
struct CacheEntry<T> {
    data: T,
    written_at: Instant,
    expires_at: Instant,
    /// Insertion sequence, breaks `written_at` ties.
    seq: u64,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<T> CacheState<T> {
    fn evict_oldest(&mut self) -> Option<String> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.written_at, e.seq))
            .map(|(k, _)| k.clone())?;
        self.entries.remove(&oldest);
        self.evictions += 1;
        Some(oldest)
    }

    /// Remove `key` if it has expired. Returns true when it was removed.
    fn expire_if_stale(&mut self, key: &str, now: Instant) -> bool {
        let stale = self
            .entries
            .get(key)
            .map(|e| e.is_expired(now))
            .unwrap_or(false);
        if stale {
            self.entries.remove(key);
            self.expirations += 1;
        }
        stale
    }
}

/// Thread-safe in-memory cache keyed by string.
///
/// All mutations, including the capacity check that precedes an insert, run
/// under one lock, so `len() <= max_entries` holds under concurrent writers.
#[derive(Debug)]
pub struct ResultCache<T> {
    config: CacheConfig,
    state: Mutex<CacheState<T>>,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config: CacheConfig {
                ttl: config.ttl,
                max_entries: config.max_entries.max(1),
            },
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_seq: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Live value for `key`, removing it first if it has expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.expire_if_stale(key, now) {
            state.misses += 1;
            tracing::debug!(key, "cache entry expired");
            return None;
        }
        match state.entries.get(key).map(|e| e.data.clone()) {
            Some(data) => {
                state.hits += 1;
                tracing::debug!(key, "cache hit");
                Some(data)
            }
            None => {
                state.misses += 1;
                tracing::debug!(key, "cache miss");
                None
            }
        }
    }

    /// Store `data` under `key` with the configured TTL.
    pub fn set(&self, key: impl Into<String>, data: T) {
        self.set_with_ttl(key, data, self.config.ttl);
    }

    /// Store `data` under `key` with an explicit TTL.
    ///
    /// Inserting a new key into a full cache evicts the earliest-written
    /// entry first. Overwriting an existing key replaces it in place.
    pub fn set_with_ttl(&self, key: impl Into<String>, data: T, ttl: Duration) {
        let key = key.into();
        let ttl = ttl.min(MAX_TTL);
        let now = Instant::now();
        let mut state = self.state.lock();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.config.max_entries {
            if let Some(evicted) = state.evict_oldest() {
                tracing::debug!(key = %evicted, "cache entry evicted");
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key.clone(),
            CacheEntry {
                data,
                written_at: now,
                expires_at: now + ttl,
                seq,
            },
        );
        tracing::debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache set");
    }

    /// Whether a live entry exists. Expired entries are removed.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.expire_if_stale(key, now) {
            return false;
        }
        state.entries.contains_key(key)
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Remove every expired entry and return how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, e| !e.is_expired(now));
        let removed = before - state.entries.len();
        state.expirations += removed as u64;
        if removed > 0 {
            tracing::info!(removed, "cache sweep removed expired entries");
        }
        removed
    }

    /// Return the live value for `key`, or run `factory`, store and return its result.
    ///
    /// `factory` is not called when a live entry exists. Failures are not
    /// cached. Concurrent callers that miss on the same key each run their
    /// own `factory`.
    pub async fn get_or_set<F, Fut, E>(&self, key: &str, factory: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let data = factory().await?;
        self.set(key, data.clone());
        Ok(data)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expirations: state.expirations,
        }
    }
}

impl<T: Clone + Send + 'static> ResultCache<T> {
    /// Run [`cleanup`](Self::cleanup) every `interval` on the tokio runtime.
    ///
    /// The sweeper stops when the returned handle is dropped or when the
    /// cache itself is dropped. Periods below [`MIN_SWEEP_INTERVAL`] are
    /// raised to it.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let cache: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.cleanup();
                    }
                    None => break,
                }
            }
        });
        SweeperHandle { handle }
    }
}

/// Aborts the background sweeper on drop.
#[derive(Debug)]
pub struct SweeperHandle {
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
