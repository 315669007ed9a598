// ABOUTME: Centralized resource container shared across the request pipeline
// ABOUTME: Single construction point for store, cache, resolver, and auth

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use crate::auth::AuthManager;
use crate::cache::{Cache, CacheConfig, TenantCache};
use crate::config::{EngineConfig, DEFAULT_GUARD};
use crate::errors::AppResult;
use crate::permissions::PermissionResolver;
use crate::services::IdentityService;
use crate::store::Store;
use crate::tenant::ContextBus;
use std::sync::Arc;

/// Shared resources wired once at startup and cloned via `Arc` into every
/// middleware layer and handler
pub struct ServerResources {
    pub store: Store,
    pub identity: IdentityService,
    pub resolver: PermissionResolver,
    pub auth: AuthManager,
    pub context_bus: Arc<ContextBus>,
    pub config: EngineConfig,
    base_cache: TenantCache,
}

impl ServerResources {
    /// Build the full resource graph from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the store or cache backend fails to initialize
    pub async fn new(config: EngineConfig) -> AppResult<Self> {
        let store = Store::new(&config.database_url).await?;
        store.migrate().await?;

        let cache = Cache::new(CacheConfig {
            redis_url: config.redis_url.clone(),
            prefix: config.cache_prefix.clone(),
            // Background sweeping conflicts with short-lived test runtimes
            enable_background_cleanup: config.environment != crate::config::Environment::Testing,
            ..CacheConfig::default()
        })
        .await?;
        tracing::info!(
            store = store.backend_info(),
            cache = cache.backend_info(),
            "Engine resources initialized"
        );

        let base_cache = TenantCache::global(
            cache,
            config.cache_prefix.clone(),
            config.cache_default_ttl,
        );
        let resolver = PermissionResolver::new(
            store.clone(),
            base_cache.clone(),
            config.super_admin_role_name.clone(),
            DEFAULT_GUARD,
        );
        let identity = IdentityService::new(store.clone(), base_cache.clone());
        let auth = AuthManager::new(config.jwt_secret.as_bytes(), 24);

        Ok(Self {
            store,
            identity,
            resolver,
            auth,
            context_bus: Arc::new(ContextBus::default()),
            config,
            base_cache,
        })
    }

    /// Cache handle bound to one tenant's namespace
    ///
    /// Collaborators that need tenant-namespaced caching (settings lookups,
    /// counters) go through this; raw keys are never constructed by callers.
    #[must_use]
    pub fn cache_for(&self, tenant_id: uuid::Uuid) -> TenantCache {
        self.base_cache.for_tenant(tenant_id)
    }

    /// Cache handle on the shared global namespace (no isolation)
    #[must_use]
    pub fn cache_global(&self) -> TenantCache {
        self.base_cache.clone()
    }

    /// Resources for tests: in-memory store and cache, no background tasks
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails
    pub async fn for_testing() -> AppResult<Self> {
        Self::new(EngineConfig::for_testing()).await
    }
}
