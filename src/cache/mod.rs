// ABOUTME: Cache abstraction layer with per-tenant namespace isolation
// ABOUTME: Pluggable backend support (in-memory, Redis) behind a provider trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! # Tenant-Namespaced Cache Layer
//!
//! Every cache entry lives under a tenant namespace. Collaborators never touch
//! raw keys: the only public surface is [`tenant::TenantCache`], a handle that
//! owns key construction internally so no caller can bypass isolation by
//! concatenating its own strings.
//!
//! Key layout: `{prefix}:{tenant_id}:{logical_key}`. The `global` namespace is
//! the explicit no-isolation escape hatch for operations with no bound tenant.

/// Cache factory for backend selection
pub mod factory;
/// In-memory cache implementation
pub mod memory;
/// Redis cache implementation
pub mod redis;
/// Tenant-namespaced cache handle
pub mod tenant;

pub use factory::Cache;
pub use tenant::TenantCache;

use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Default maximum entries for the in-memory backend
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
/// Default background cleanup interval in seconds
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Cache provider trait for pluggable backend implementations
///
/// Backends receive fully constructed [`CacheKey`] values; they never build
/// keys themselves. A `ttl` of `None` stores the entry without expiry.
#[async_trait::async_trait]
pub trait CacheProvider: Send + Sync + Clone {
    /// Create new cache instance with configuration
    ///
    /// # Errors
    ///
    /// Returns an error if cache initialization fails
    async fn new(config: CacheConfig) -> AppResult<Self>
    where
        Self: Sized;

    /// Store value in cache; `ttl = None` means no implicit expiry
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or storage fails
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> AppResult<()>;

    /// Retrieve value from cache
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails
    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>>;

    /// Remove single cache entry
    ///
    /// # Errors
    ///
    /// Returns an error if invalidation fails
    async fn invalidate(&self, key: &CacheKey) -> AppResult<()>;

    /// Remove all cache entries matching a glob pattern, returning the count removed
    ///
    /// # Errors
    ///
    /// Returns an error if pattern invalidation fails
    async fn invalidate_pattern(&self, pattern: &str) -> AppResult<u64>;

    /// Atomically add `delta` to the integer stored at `key`, initializing
    /// missing entries to zero first; returns the new value
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not an integer
    async fn increment(&self, key: &CacheKey, delta: i64) -> AppResult<i64>;

    /// Check if key exists in cache
    ///
    /// # Errors
    ///
    /// Returns an error if existence check fails
    async fn exists(&self, key: &CacheKey) -> AppResult<bool>;

    /// Get remaining TTL for key; `None` when missing or without expiry
    ///
    /// # Errors
    ///
    /// Returns an error if TTL check fails
    async fn ttl(&self, key: &CacheKey) -> AppResult<Option<Duration>>;

    /// Verify cache backend is healthy
    ///
    /// # Errors
    ///
    /// Returns an error if health check fails
    async fn health_check(&self) -> AppResult<()>;

    /// Clear all cache entries under the engine prefix (for testing/admin)
    ///
    /// # Errors
    ///
    /// Returns an error if clear operation fails
    async fn clear_all(&self) -> AppResult<()>;
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries (for in-memory cache)
    pub max_entries: usize,
    /// Redis connection URL (selects the Redis backend when set)
    pub redis_url: Option<String>,
    /// Cleanup interval for expired entries
    pub cleanup_interval: Duration,
    /// Enable background cleanup task (false in tests to avoid runtime conflicts)
    pub enable_background_cleanup: bool,
    /// Engine-wide key prefix
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            redis_url: None,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            enable_background_cleanup: true,
            prefix: crate::config::DEFAULT_CACHE_PREFIX.to_owned(),
        }
    }
}

/// Structured cache key with tenant namespace isolation
///
/// Construction is crate-private; collaborators obtain keys only through
/// [`tenant::TenantCache`], which owns the namespacing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix: String,
    namespace: Namespace,
    logical: String,
}

/// Tenant namespace of a cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Isolated per-tenant namespace
    Tenant(Uuid),
    /// Shared namespace for operations with no bound tenant; not isolated
    Global,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tenant(id) => write!(f, "{id}"),
            Self::Global => write!(f, "global"),
        }
    }
}

impl CacheKey {
    pub(crate) fn new(prefix: &str, namespace: Namespace, logical: impl Into<String>) -> Self {
        Self {
            prefix: prefix.to_owned(),
            namespace,
            logical: logical.into(),
        }
    }

    /// Glob pattern matching every key in a namespace
    pub(crate) fn namespace_pattern(prefix: &str, namespace: Namespace) -> String {
        format!("{prefix}:{namespace}:*")
    }

    /// The namespace this key belongs to
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.prefix, self.namespace, self.logical)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let tenant_id = Uuid::new_v4();
        let key = CacheKey::new("clubdesk", Namespace::Tenant(tenant_id), "perms:42");
        assert_eq!(key.to_string(), format!("clubdesk:{tenant_id}:perms:42"));
    }

    #[test]
    fn test_global_namespace_layout() {
        let key = CacheKey::new("clubdesk", Namespace::Global, "settings");
        assert_eq!(key.to_string(), "clubdesk:global:settings");
    }

    #[test]
    fn test_namespace_pattern_scopes_one_tenant() {
        let tenant_id = Uuid::new_v4();
        let pattern = CacheKey::namespace_pattern("clubdesk", Namespace::Tenant(tenant_id));
        assert_eq!(pattern, format!("clubdesk:{tenant_id}:*"));

        let other = CacheKey::new("clubdesk", Namespace::Tenant(Uuid::new_v4()), "perms:42");
        let matcher = glob::Pattern::new(&pattern).unwrap();
        assert!(!matcher.matches(&other.to_string()));
    }
}
