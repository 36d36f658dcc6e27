//! Read-path snapshot cache.
//!
//! Profile and leaderboard reads go through a [`SnapshotCache`] keyed by
//! opaque strings with per-key TTLs. The cache stores serialised JSON so
//! the trait stays payload-agnostic; the engine handles serialisation and
//! treats every cache failure as a miss (reads fall through to the store,
//! never fail because the cache is down).
//!
//! Write operations evict the affected profile key rather than updating it
//! in place, so a cached snapshot is only ever a true past state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use idlemint_types::PlayerId;

/// Errors surfaced by a cache backend. Always logged, never propagated to
/// callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// The backend rejected or failed the operation.
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Cache key for a player's profile snapshot.
#[must_use]
pub fn profile_key(player: PlayerId) -> String {
    format!("profile:{player}")
}

/// Cache key for a leaderboard page of the given size.
#[must_use]
pub fn leaderboard_key(limit: usize) -> String {
    format!("leaderboard:{limit}")
}

/// TTL-based string cache for serialised read snapshots.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Fetch a live entry, or `None` on miss or expiry.
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store an entry with a TTL.
    async fn put_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Evict an entry. Evicting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// A cache that stores nothing; every read is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl SnapshotCache for NoopCache {
    async fn get_raw(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn put_raw(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// In-process TTL cache for tests and single-node development.
///
/// Expired entries are dropped lazily on read; there is no background
/// sweeper, so memory is bounded by the working key set.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SnapshotCache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Backend(String::from("ttl overflow")))?;
        self.lock().insert(key.to_owned(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock().remove(key);
        Ok(())
    }
}
