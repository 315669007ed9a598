// ABOUTME: Identity service pairing each store mutation with cache invalidation
// ABOUTME: Invalidation completes before the mutation returns, never lazily

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! # Identity Service
//!
//! The single write path for tenants, roles, and assignments. Every mutation
//! writes to the store and then synchronously invalidates the cache entries
//! the change could have stalled, so a check issued immediately after a
//! revocation sees the revocation.
//!
//! Scope of invalidation follows blast radius: user-level assignment changes
//! drop that user's cached resolution from their own tenant namespace;
//! scoped-role grant changes and tenant lifecycle changes flush the whole
//! tenant namespace; global-role grant changes walk the role's holders, since
//! those span namespaces.

use crate::cache::tenant::TenantCache;
use crate::errors::{AppError, AppResult};
use crate::models::{Permission, Role, Tenant, User};
use crate::store::Store;
use uuid::Uuid;

/// Coordinates identity mutations and their cache invalidation
#[derive(Clone)]
pub struct IdentityService {
    store: Store,
    cache: TenantCache,
}

fn resolution_key(user_id: Uuid) -> String {
    format!("perms:{user_id}")
}

impl IdentityService {
    /// Create a service
    ///
    /// `cache` should be a global-namespace handle; mutations rebind it to the
    /// affected tenant.
    #[must_use]
    pub fn new(store: Store, cache: TenantCache) -> Self {
        Self { store, cache }
    }

    /// Underlying store, for read paths that need no invalidation
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    fn cache_for(&self, tenant_id: Option<Uuid>) -> TenantCache {
        tenant_id.map_or_else(|| self.cache.clone(), |id| self.cache.for_tenant(id))
    }

    async fn invalidate_user(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> AppResult<()> {
        self.cache_for(tenant_id)
            .forget(&resolution_key(user_id))
            .await
    }

    /// Global roles cross tenant namespaces, so invalidation walks the holders
    async fn invalidate_role_holders(&self, role_id: Uuid) -> AppResult<()> {
        for user in self.store.users_with_role(role_id).await? {
            self.invalidate_user(user.id, user.tenant_id).await?;
        }
        Ok(())
    }

    async fn flush_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        let removed = self.cache_for(Some(tenant_id)).flush().await?;
        tracing::debug!(
            tenant_id = %tenant_id,
            entries = removed,
            "Flushed tenant cache namespace"
        );
        Ok(())
    }

    // ================================
    // Tenants
    // ================================

    /// Create a tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant already exists
    pub async fn create_tenant(&self, name: &str, slug: &str) -> AppResult<Tenant> {
        let tenant = Tenant::new(name, slug);
        self.store.create_tenant(&tenant).await?;
        tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, "Tenant created");
        Ok(tenant)
    }

    /// Replace a tenant's settings and flush its cache namespace
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist
    pub async fn update_tenant_settings(
        &self,
        tenant_id: Uuid,
        settings: serde_json::Value,
    ) -> AppResult<()> {
        self.store
            .update_tenant_settings(tenant_id, &settings)
            .await?;
        self.flush_tenant(tenant_id).await
    }

    /// Deactivate a tenant and flush its cache namespace
    ///
    /// Subsequent context installs for this tenant fail with `TenantInactive`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist
    pub async fn deactivate_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        self.store.set_tenant_active(tenant_id, false).await?;
        tracing::info!(tenant_id = %tenant_id, "Tenant deactivated");
        self.flush_tenant(tenant_id).await
    }

    /// Reactivate a tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist
    pub async fn reactivate_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        self.store.set_tenant_active(tenant_id, true).await?;
        tracing::info!(tenant_id = %tenant_id, "Tenant reactivated");
        Ok(())
    }

    /// Soft-delete a tenant: data retained, access revoked, cache flushed
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist
    pub async fn soft_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        self.store.soft_delete_tenant(tenant_id).await?;
        tracing::info!(tenant_id = %tenant_id, "Tenant soft-deleted");
        self.flush_tenant(tenant_id).await
    }

    /// Hard-delete a tenant: cascades to users, roles, and assignments
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist
    pub async fn hard_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        self.store.hard_delete_tenant(tenant_id).await?;
        tracing::info!(tenant_id = %tenant_id, "Tenant hard-deleted");
        self.flush_tenant(tenant_id).await
    }

    // ================================
    // Users
    // ================================

    /// Create a user bound to a tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the email is taken or the tenant does not exist
    pub async fn create_user(
        &self,
        email: &str,
        display_name: &str,
        tenant_id: Uuid,
    ) -> AppResult<User> {
        if self.store.get_tenant(tenant_id).await?.is_none() {
            return Err(AppError::not_found(format!("Tenant {tenant_id}")));
        }
        let user = User::new(email, display_name, tenant_id);
        self.store.create_user(&user).await?;
        Ok(user)
    }

    /// Create a user with no tenant binding (operators, service accounts)
    ///
    /// # Errors
    ///
    /// Returns an error if the email is taken
    pub async fn create_unscoped_user(&self, email: &str, display_name: &str) -> AppResult<User> {
        let user = User::new_unscoped(email, display_name);
        self.store.create_user(&user).await?;
        Ok(user)
    }

    // ================================
    // Roles & Permissions
    // ================================

    /// Create a tenant-scoped role
    ///
    /// # Errors
    ///
    /// Returns an error if `(name, guard, tenant)` is already taken
    pub async fn create_role(&self, name: &str, guard: &str, tenant_id: Uuid) -> AppResult<Role> {
        let role = Role::scoped(name, guard, tenant_id);
        self.store.create_role(&role).await?;
        Ok(role)
    }

    /// Create a global (unscoped) role
    ///
    /// # Errors
    ///
    /// Returns an error if `(name, guard)` is already taken globally
    pub async fn create_global_role(&self, name: &str, guard: &str) -> AppResult<Role> {
        let role = Role::global(name, guard);
        self.store.create_role(&role).await?;
        Ok(role)
    }

    /// Register a permission
    ///
    /// # Errors
    ///
    /// Returns an error if `(name, guard)` is already taken
    pub async fn create_permission(&self, name: &str, guard: &str) -> AppResult<Permission> {
        let permission = Permission::new(name, guard);
        self.store.create_permission(&permission).await?;
        Ok(permission)
    }

    /// Assign a role to a user and drop the user's cached resolution
    ///
    /// The cached resolution lives in the user's tenant namespace regardless
    /// of the role's scope, so invalidation keys on the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user or role does not exist
    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id}")))?;
        self.store.assign_role_to_user(user_id, role_id).await?;
        self.invalidate_user(user_id, user.tenant_id).await
    }

    /// Revoke a role from a user and drop the user's cached resolution
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist
    pub async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id}")))?;
        self.store.revoke_role_from_user(user_id, role_id).await?;
        self.invalidate_user(user_id, user.tenant_id).await
    }

    /// Grant a permission to a role and invalidate everyone it could affect
    ///
    /// Scoped roles affect only their tenant, so the tenant namespace is
    /// flushed. A global role's holders sit in per-tenant namespaces, so each
    /// holder's resolution is dropped individually.
    ///
    /// # Errors
    ///
    /// Returns an error if the role or permission does not exist
    pub async fn grant_permission_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        let role = self
            .store
            .get_role(role_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role {role_id}")))?;
        self.store
            .grant_permission_to_role(role_id, permission_id)
            .await?;
        match role.tenant_id {
            Some(tenant_id) => self.flush_tenant(tenant_id).await,
            None => self.invalidate_role_holders(role_id).await,
        }
    }

    /// Revoke a permission from a role and invalidate everyone it could affect
    ///
    /// # Errors
    ///
    /// Returns an error if the role does not exist
    pub async fn revoke_permission_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        let role = self
            .store
            .get_role(role_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role {role_id}")))?;
        self.store
            .revoke_permission_from_role(role_id, permission_id)
            .await?;
        match role.tenant_id {
            Some(tenant_id) => self.flush_tenant(tenant_id).await,
            None => self.invalidate_role_holders(role_id).await,
        }
    }

    /// Grant a permission directly to a user and drop their cached resolution
    ///
    /// # Errors
    ///
    /// Returns an error if the user or permission does not exist
    pub async fn grant_permission_to_user(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id}")))?;
        self.store
            .grant_permission_to_user(user_id, permission_id)
            .await?;
        self.invalidate_user(user_id, user.tenant_id).await
    }

    /// Revoke a directly granted permission and drop the cached resolution
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist
    pub async fn revoke_permission_from_user(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id}")))?;
        self.store
            .revoke_permission_from_user(user_id, permission_id)
            .await?;
        self.invalidate_user(user_id, user.tenant_id).await
    }
}
