// ABOUTME: Tenant-namespaced cache handle owning all key construction
// ABOUTME: Prevents callers from building raw keys and bypassing tenant isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! Tenant cache handle
//!
//! [`TenantCache`] is the only cache surface collaborators see. Every
//! operation is implicitly namespaced by the tenant the handle was built for;
//! `flush` clears exactly that namespace and never the global cache.
//!
//! A handle with no bound tenant uses the shared `global` namespace. That
//! namespace is an explicit no-isolation escape hatch (super-admin global
//! operations): callers must not assume isolation from other global callers.

use super::{factory::Cache, CacheKey, Namespace};
use crate::errors::AppResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Cache handle bound to one tenant namespace
#[derive(Clone)]
pub struct TenantCache {
    cache: Cache,
    prefix: String,
    namespace: Namespace,
    default_ttl: Option<Duration>,
}

impl TenantCache {
    /// Create a handle bound to a tenant namespace
    #[must_use]
    pub fn new(
        cache: Cache,
        prefix: impl Into<String>,
        tenant_id: Uuid,
        default_ttl: Option<Duration>,
    ) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            namespace: Namespace::Tenant(tenant_id),
            default_ttl,
        }
    }

    /// Create a handle on the shared global namespace (no isolation)
    #[must_use]
    pub fn global(
        cache: Cache,
        prefix: impl Into<String>,
        default_ttl: Option<Duration>,
    ) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            namespace: Namespace::Global,
            default_ttl,
        }
    }

    /// Rebind this handle to a different tenant's namespace
    #[must_use]
    pub fn for_tenant(&self, tenant_id: Uuid) -> Self {
        Self {
            cache: self.cache.clone(),
            prefix: self.prefix.clone(),
            namespace: Namespace::Tenant(tenant_id),
            default_ttl: self.default_ttl,
        }
    }

    /// The namespace this handle operates on
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    fn key(&self, logical_key: &str) -> CacheKey {
        CacheKey::new(&self.prefix, self.namespace, logical_key)
    }

    /// Retrieve a value from this namespace
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or deserialization fails
    pub async fn get<T: DeserializeOwned>(&self, logical_key: &str) -> AppResult<Option<T>> {
        self.cache.get(&self.key(logical_key)).await
    }

    /// Store a value in this namespace with the handle's default TTL
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend fails
    pub async fn put<T: Serialize + Send + Sync>(
        &self,
        logical_key: &str,
        value: &T,
    ) -> AppResult<()> {
        self.cache
            .set(&self.key(logical_key), value, self.default_ttl)
            .await
    }

    /// Store a value with an explicit TTL (`None` = no expiry)
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend fails
    pub async fn put_with_ttl<T: Serialize + Send + Sync>(
        &self,
        logical_key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> AppResult<()> {
        self.cache.set(&self.key(logical_key), value, ttl).await
    }

    /// Remove a single entry from this namespace
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn forget(&self, logical_key: &str) -> AppResult<()> {
        self.cache.invalidate(&self.key(logical_key)).await
    }

    /// Get-or-compute: return the cached value, or compute, store, and return it
    ///
    /// # Errors
    ///
    /// Returns an error if the compute closure fails or the backend fails
    pub async fn remember<T, F, Fut>(&self, logical_key: &str, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = AppResult<T>> + Send,
    {
        if let Some(cached) = self.get::<T>(logical_key).await? {
            return Ok(cached);
        }

        let value = compute().await?;
        self.put(logical_key, &value).await?;
        Ok(value)
    }

    /// Atomically increment the counter at `logical_key`, returning the new value
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not an integer
    pub async fn increment(&self, logical_key: &str, delta: i64) -> AppResult<i64> {
        self.cache.increment(&self.key(logical_key), delta).await
    }

    /// Atomically decrement the counter at `logical_key`, returning the new value
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not an integer
    pub async fn decrement(&self, logical_key: &str, delta: i64) -> AppResult<i64> {
        self.cache.increment(&self.key(logical_key), -delta).await
    }

    /// Bulk-invalidate every entry in this handle's namespace
    ///
    /// Clears only the current namespace, never the whole cache. Returns the
    /// number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn flush(&self) -> AppResult<u64> {
        let pattern = CacheKey::namespace_pattern(&self.prefix, self.namespace);
        self.cache.invalidate_pattern(&pattern).await
    }
}
