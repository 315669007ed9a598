// ABOUTME: Permission resolution with tenant filtering and cached results
// ABOUTME: OR-pipe expression checks, super-admin bypass, cache degradation

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! # Permission Resolver
//!
//! Resolves the effective permission set for a user within a tenant boundary:
//! the union of directly granted permissions and permissions inherited through
//! assigned roles. Role lookups are tenant-filtered at the store layer, and of
//! the global (unscoped) roles only the reserved one contributes grants.
//!
//! Resolutions are cached per `(tenant, user)` with no implicit expiry; the
//! service layer invalidates on every mutation. A failing cache backend
//! degrades to direct store resolution rather than failing the check.
//!
//! The reserved global super-admin role bypasses every check and is consulted
//! fresh on each call, so revocation takes effect mid-session.

use crate::cache::tenant::TenantCache;
use crate::errors::AppResult;
use crate::store::Store;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Result of evaluating one permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The user holds a permission satisfying the expression
    Allowed,
    /// Every named permission exists but none is held
    Denied,
    /// No named permission is registered at all
    ///
    /// Collapses to a denial at the boolean boundary; never an error.
    Unknown,
}

impl CheckOutcome {
    /// Collapse to the boolean the authorization boundary needs
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Cache hit/miss counters for resolution lookups
#[derive(Default)]
pub struct ResolverMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolverMetrics {
    /// `(hits, misses)` snapshot
    #[must_use]
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

/// Resolves and checks effective permissions
#[derive(Clone)]
pub struct PermissionResolver {
    store: Store,
    cache: TenantCache,
    super_admin_role: String,
    guard: String,
    metrics: Arc<ResolverMetrics>,
}

fn resolution_key(user_id: Uuid) -> String {
    format!("perms:{user_id}")
}

impl PermissionResolver {
    /// Create a resolver
    ///
    /// `cache` should be a global-namespace handle; the resolver rebinds it to
    /// the tenant of each resolution.
    #[must_use]
    pub fn new(
        store: Store,
        cache: TenantCache,
        super_admin_role: impl Into<String>,
        guard: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            super_admin_role: super_admin_role.into(),
            guard: guard.into(),
            metrics: Arc::new(ResolverMetrics::default()),
        }
    }

    /// Cache hit/miss counters
    #[must_use]
    pub fn metrics(&self) -> &ResolverMetrics {
        &self.metrics
    }

    fn cache_for(&self, tenant_id: Option<Uuid>) -> TenantCache {
        tenant_id.map_or_else(|| self.cache.clone(), |id| self.cache.for_tenant(id))
    }

    /// Effective permission names for a user within a tenant boundary
    ///
    /// Cached with no implicit expiry; mutations invalidate through
    /// [`crate::services::IdentityService`]. A cache backend failure is logged
    /// and the resolution falls through to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn resolve(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> AppResult<HashSet<String>> {
        let cache = self.cache_for(tenant_id);
        let key = resolution_key(user_id);

        match cache.get::<HashSet<String>>(&key).await {
            Ok(Some(cached)) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Cache read failed, resolving permissions directly"
                );
            }
        }
        self.metrics.misses.fetch_add(1, Ordering::Relaxed);

        let resolved = self.resolve_uncached(user_id, tenant_id).await?;

        if let Err(e) = cache.put_with_ttl(&key, &resolved, None).await {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Cache write failed, resolution not cached"
            );
        }
        Ok(resolved)
    }

    async fn resolve_uncached(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> AppResult<HashSet<String>> {
        let mut names: HashSet<String> = self
            .store
            .direct_permissions_for_user(user_id)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();

        for role in self.store.roles_for_user(user_id, tenant_id).await? {
            // Of the global roles, only the reserved one carries grants into
            // a tenant boundary
            if !role.tenant_scoped && role.name != self.super_admin_role {
                continue;
            }
            for permission in self.store.permissions_for_role(role.id).await? {
                names.insert(permission.name);
            }
        }
        Ok(names)
    }

    /// Evaluate an OR-pipe permission expression for a user
    ///
    /// `"posts.edit|posts.admin"` passes when the user holds either name.
    /// The super-admin bypass is consulted first, against the store directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn evaluate(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        expression: &str,
    ) -> AppResult<CheckOutcome> {
        if self
            .store
            .user_holds_global_role(user_id, &self.super_admin_role)
            .await?
        {
            return Ok(CheckOutcome::Allowed);
        }

        let held = self.resolve(user_id, tenant_id).await?;

        let mut any_registered = false;
        for name in expression.split('|').map(str::trim).filter(|n| !n.is_empty()) {
            if held.contains(name) {
                return Ok(CheckOutcome::Allowed);
            }
            if self.store.find_permission(name, &self.guard).await?.is_some() {
                any_registered = true;
            }
        }

        if any_registered {
            Ok(CheckOutcome::Denied)
        } else {
            Ok(CheckOutcome::Unknown)
        }
    }

    /// Boolean permission check: `Unknown` collapses to a denial
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn check(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        expression: &str,
    ) -> AppResult<bool> {
        Ok(self.evaluate(user_id, tenant_id, expression).await?.is_allowed())
    }

    /// Drop the cached resolution for one user in one tenant boundary
    ///
    /// # Errors
    ///
    /// Returns an error if the cache backend fails
    pub async fn invalidate_user(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> AppResult<()> {
        self.cache_for(tenant_id)
            .forget(&resolution_key(user_id))
            .await
    }
}
