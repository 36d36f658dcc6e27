//! Redis-backed read-path cache.
//!
//! Implements the engine's [`SnapshotCache`] over a [`fred`] client. TTLs
//! ride on the `SET` itself (`EX`), so entries expire server-side and the
//! application never sweeps. The engine treats any error here as a cache
//! miss; this type only reports, never retries.

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;

use idlemint_engine::cache::{CacheError, SnapshotCache};

use crate::error::DbError;

/// Connection handle to a Redis-compatible instance.
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    /// Connect to Redis at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Redis`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Redis URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Redis");
        Ok(Self { client })
    }
}

#[async_trait]
impl SnapshotCache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value: Option<String> = self
            .client
            .get(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(value)
    }

    async fn put_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let secs = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);
        let _: () = self
            .client
            .set(key, value.as_str(), Some(Expiration::EX(secs)), None, false)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let _: u32 = self
            .client
            .del(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }
}
