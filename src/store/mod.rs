// ABOUTME: Scoped identity store abstraction for tenants, users, roles, and permissions
// ABOUTME: Plugin architecture with SQLite and in-memory backends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! # Scoped Identity Store
//!
//! Durable storage for the identity model. Every query that feeds an
//! authorization decision is tenant-filtered at this layer: role lookups for a
//! user only ever return roles scoped to that user's tenant, plus global
//! (unscoped) roles; the resolver narrows the global ones further to the
//! reserved role. The store is read-shared and write-serialized per
//! mutating call; cache invalidation on mutation is orchestrated one level up
//! by [`crate::services::IdentityService`].

pub mod factory;
pub mod memory;
pub mod sqlite;

pub use factory::Store;

use crate::errors::AppResult;
use crate::models::{Permission, Role, Tenant, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Core identity store abstraction
///
/// All backends implement this trait to provide a consistent interface for
/// the resolver and service layers.
#[async_trait]
pub trait IdentityStore: Send + Sync + Clone {
    /// Create a new store from a connection string
    async fn new(database_url: &str) -> AppResult<Self>
    where
        Self: Sized;

    /// Run migrations to set up schema
    async fn migrate(&self) -> AppResult<()>;

    // ================================
    // Tenants
    // ================================

    /// Create a new tenant
    async fn create_tenant(&self, tenant: &Tenant) -> AppResult<()>;

    /// Get tenant by ID (soft-deleted tenants are still returned; callers
    /// check `deleted_at`/`is_active`)
    async fn get_tenant(&self, tenant_id: Uuid) -> AppResult<Option<Tenant>>;

    /// Replace a tenant's settings document
    async fn update_tenant_settings(
        &self,
        tenant_id: Uuid,
        settings: &serde_json::Value,
    ) -> AppResult<()>;

    /// Activate or deactivate a tenant
    async fn set_tenant_active(&self, tenant_id: Uuid, is_active: bool) -> AppResult<()>;

    /// Soft-delete: data retained, access revoked
    async fn soft_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()>;

    /// Hard-delete: removes the tenant and cascades to users, roles, and assignments
    async fn hard_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()>;

    // ================================
    // Users
    // ================================

    /// Create a new user account
    async fn create_user(&self, user: &User) -> AppResult<()>;

    /// Get user by ID
    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Get user by email address
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    // ================================
    // Roles & Permissions
    // ================================

    /// Create a role; identity is `(name, guard, tenant)` so the same name in
    /// two tenants creates two roles
    async fn create_role(&self, role: &Role) -> AppResult<()>;

    /// Get role by ID
    async fn get_role(&self, role_id: Uuid) -> AppResult<Option<Role>>;

    /// Find a role by scoped identity; `tenant_id = None` finds the global role
    async fn find_role(
        &self,
        name: &str,
        guard: &str,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Option<Role>>;

    /// Create a permission (not tenant-owned)
    async fn create_permission(&self, permission: &Permission) -> AppResult<()>;

    /// Find a permission by `(name, guard)`
    async fn find_permission(&self, name: &str, guard: &str) -> AppResult<Option<Permission>>;

    // ================================
    // Assignments
    // ================================

    /// Assign a role to a user
    async fn assign_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()>;

    /// Revoke a role from a user
    async fn revoke_role_from_user(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()>;

    /// Grant a permission to a role
    async fn grant_permission_to_role(&self, role_id: Uuid, permission_id: Uuid) -> AppResult<()>;

    /// Revoke a permission from a role
    async fn revoke_permission_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()>;

    /// Grant a permission directly to a user
    async fn grant_permission_to_user(&self, user_id: Uuid, permission_id: Uuid) -> AppResult<()>;

    /// Revoke a directly granted permission from a user
    async fn revoke_permission_from_user(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()>;

    // ================================
    // Resolution queries (tenant-filtered)
    // ================================

    /// Roles assigned to a user, filtered to the given tenant boundary
    ///
    /// Returns assigned roles that are either tenant-scoped to `tenant_id` or
    /// global (unscoped). With `tenant_id = None` only global roles are
    /// returned: a user with no tenant never sees any tenant's roles.
    async fn roles_for_user(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> AppResult<Vec<Role>>;

    /// Permissions granted to a role
    async fn permissions_for_role(&self, role_id: Uuid) -> AppResult<Vec<Permission>>;

    /// Permissions granted directly to a user
    async fn direct_permissions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Permission>>;

    /// Users currently assigned the role
    ///
    /// Drives targeted cache invalidation when a global role's grants change,
    /// since its holders span tenant namespaces.
    async fn users_with_role(&self, role_id: Uuid) -> AppResult<Vec<User>>;

    /// Whether the user currently holds the named global (unscoped) role
    ///
    /// Consulted on every check for the super-admin bypass, so role revocation
    /// takes effect mid-session.
    async fn user_holds_global_role(&self, user_id: Uuid, role_name: &str) -> AppResult<bool>;
}
