// ABOUTME: Redis cache implementation with connection pooling and TTL support
// ABOUTME: Provides distributed caching for multi-instance deployments
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use super::{CacheConfig, CacheKey, CacheProvider};
use crate::errors::{AppError, AppResult};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Redis cache implementation with connection pooling
///
/// Uses Redis `ConnectionManager` for automatic reconnection. Keys arrive
/// fully namespaced from the cache layer; pattern invalidation uses SCAN so
/// large namespaces never block the server.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    prefix: String,
}

impl RedisCache {
    async fn new_with_config(config: &CacheConfig) -> AppResult<Self> {
        let redis_url = config
            .redis_url
            .as_ref()
            .ok_or_else(|| AppError::config("Redis URL is required for Redis cache backend"))?;

        info!("Connecting to Redis at {}", redis_url);

        let client = redis::Client::open(redis_url.as_str())
            .map_err(|e| AppError::cache(format!("Failed to create Redis client: {e}")))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::cache(format!("Failed to connect to Redis: {e}")))?;

        info!("Successfully connected to Redis");

        Ok(Self {
            manager,
            prefix: config.prefix.clone(),
        })
    }

    /// Delete all keys matching `pattern` using cursor-based SCAN
    async fn scan_delete(&self, pattern: &str) -> AppResult<u64> {
        let mut conn = self.manager.clone();
        let mut count = 0u64;
        let mut cursor = 0u64;

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    error!("Redis SCAN failed: {}", e);
                    AppError::from(e)
                })?;

            if !keys.is_empty() {
                let deleted: u64 = conn.del(&keys).await.map_err(|e| {
                    error!("Redis DEL failed: {}", e);
                    AppError::from(e)
                })?;
                count += deleted;
            }

            cursor = new_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(count)
    }
}

#[async_trait::async_trait]
impl CacheProvider for RedisCache {
    async fn new(config: CacheConfig) -> AppResult<Self>
    where
        Self: Sized,
    {
        Self::new_with_config(&config).await
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> AppResult<()> {
        let serialized = serde_json::to_vec(value)?;
        let redis_key = key.to_string();
        let mut conn = self.manager.clone();

        match ttl {
            // SETEX sets value and expiration atomically
            Some(ttl) => conn
                .set_ex::<_, _, ()>(&redis_key, serialized, ttl.as_secs())
                .await
                .map_err(|e| {
                    error!("Redis SETEX operation failed: {}", e);
                    AppError::from(e)
                })?,
            None => conn
                .set::<_, _, ()>(&redis_key, serialized)
                .await
                .map_err(|e| {
                    error!("Redis SET operation failed: {}", e);
                    AppError::from(e)
                })?,
        }

        Ok(())
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let redis_key = key.to_string();
        let mut conn = self.manager.clone();

        let data: Option<Vec<u8>> = conn.get(&redis_key).await.map_err(|e| {
            error!("Redis GET operation failed: {}", e);
            AppError::from(e)
        })?;

        match data {
            Some(bytes) => {
                let value: T = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::cache(format!("Cache deserialization failed: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        let redis_key = key.to_string();
        let mut conn = self.manager.clone();

        let _: () = conn.del(&redis_key).await.map_err(|e| {
            error!("Redis DEL operation failed: {}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> AppResult<u64> {
        // glob and Redis use the same wildcard syntax for these patterns
        self.scan_delete(pattern).await
    }

    async fn increment(&self, key: &CacheKey, delta: i64) -> AppResult<i64> {
        let redis_key = key.to_string();
        let mut conn = self.manager.clone();

        // INCRBY initializes missing keys to zero; JSON integers are stored as
        // plain digit strings so the representations are compatible
        let next: i64 = conn.incr(&redis_key, delta).await.map_err(|e| {
            error!("Redis INCRBY operation failed: {}", e);
            AppError::from(e)
        })?;

        Ok(next)
    }

    async fn exists(&self, key: &CacheKey) -> AppResult<bool> {
        let redis_key = key.to_string();
        let mut conn = self.manager.clone();

        let exists: bool = conn.exists(&redis_key).await.map_err(|e| {
            error!("Redis EXISTS operation failed: {}", e);
            AppError::from(e)
        })?;

        Ok(exists)
    }

    async fn ttl(&self, key: &CacheKey) -> AppResult<Option<Duration>> {
        let redis_key = key.to_string();
        let mut conn = self.manager.clone();

        let ttl_secs: i64 = conn.ttl(&redis_key).await.map_err(|e| {
            error!("Redis TTL operation failed: {}", e);
            AppError::from(e)
        })?;

        // Redis returns -2 if key doesn't exist, -1 if key has no expiration
        match ttl_secs {
            secs if secs > 0 => Ok(Some(Duration::from_secs(secs as u64))),
            _ => Ok(None),
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();

        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis PING failed: {}", e);
                AppError::from(e)
            })?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::cache(format!(
                "Unexpected PING response '{response}'"
            )))
        }
    }

    async fn clear_all(&self) -> AppResult<()> {
        // Clear only keys under the engine prefix (safe for shared Redis instances)
        let pattern = format!("{}:*", self.prefix);
        self.scan_delete(&pattern).await?;
        Ok(())
    }
}
