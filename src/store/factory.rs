// ABOUTME: Identity store factory for environment-based backend selection
// ABOUTME: Dispatches between SQLite and in-memory backends at runtime

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use super::{memory::MemoryStore, sqlite::SqliteStore, IdentityStore};
use crate::errors::{AppError, AppResult};
use crate::models::{Permission, Role, Tenant, User};
use uuid::Uuid;

/// Identity store wrapper that delegates to the configured backend
///
/// The backend is chosen from the database URL scheme, so deployments switch
/// storage by configuration alone.
#[derive(Clone)]
pub enum Store {
    /// In-memory backend (tests, single-process development)
    Memory(MemoryStore),
    /// SQLite backend (durable deployments)
    Sqlite(SqliteStore),
}

impl Store {
    /// Create a store instance from a database URL
    ///
    /// `memory` selects the in-memory backend; `sqlite:` URLs select SQLite.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL scheme is unsupported or the backend fails
    /// to initialize
    pub async fn new(database_url: &str) -> AppResult<Self> {
        if database_url == "memory" {
            tracing::info!("Initializing in-memory identity store");
            Ok(Self::Memory(MemoryStore::new(database_url).await?))
        } else if database_url.starts_with("sqlite:") {
            tracing::info!("Initializing SQLite identity store");
            Ok(Self::Sqlite(SqliteStore::new(database_url).await?))
        } else {
            Err(AppError::config(format!(
                "Unsupported database URL: {database_url}"
            )))
        }
    }

    /// Descriptive string for the active backend
    #[must_use]
    pub const fn backend_info(&self) -> &'static str {
        match self {
            Self::Memory(_) => "in-memory",
            Self::Sqlite(_) => "SQLite",
        }
    }

    /// Run schema migrations
    ///
    /// # Errors
    ///
    /// Returns an error if migration fails
    pub async fn migrate(&self) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.migrate().await,
            Self::Sqlite(store) => store.migrate().await,
        }
    }

    /// Create a new tenant
    ///
    /// # Errors
    ///
    /// Returns an error if a tenant with the same id or slug exists
    pub async fn create_tenant(&self, tenant: &Tenant) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.create_tenant(tenant).await,
            Self::Sqlite(store) => store.create_tenant(tenant).await,
        }
    }

    /// Get tenant by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn get_tenant(&self, tenant_id: Uuid) -> AppResult<Option<Tenant>> {
        match self {
            Self::Memory(store) => store.get_tenant(tenant_id).await,
            Self::Sqlite(store) => store.get_tenant(tenant_id).await,
        }
    }

    /// Replace a tenant's settings document
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist
    pub async fn update_tenant_settings(
        &self,
        tenant_id: Uuid,
        settings: &serde_json::Value,
    ) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.update_tenant_settings(tenant_id, settings).await,
            Self::Sqlite(store) => store.update_tenant_settings(tenant_id, settings).await,
        }
    }

    /// Activate or deactivate a tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist
    pub async fn set_tenant_active(&self, tenant_id: Uuid, is_active: bool) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.set_tenant_active(tenant_id, is_active).await,
            Self::Sqlite(store) => store.set_tenant_active(tenant_id, is_active).await,
        }
    }

    /// Soft-delete a tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist
    pub async fn soft_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.soft_delete_tenant(tenant_id).await,
            Self::Sqlite(store) => store.soft_delete_tenant(tenant_id).await,
        }
    }

    /// Hard-delete a tenant and cascade to its users, roles, and assignments
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist
    pub async fn hard_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.hard_delete_tenant(tenant_id).await,
            Self::Sqlite(store) => store.hard_delete_tenant(tenant_id).await,
        }
    }

    /// Create a new user account
    ///
    /// # Errors
    ///
    /// Returns an error if the email is already taken
    pub async fn create_user(&self, user: &User) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.create_user(user).await,
            Self::Sqlite(store) => store.create_user(user).await,
        }
    }

    /// Get user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        match self {
            Self::Memory(store) => store.get_user(user_id).await,
            Self::Sqlite(store) => store.get_user(user_id).await,
        }
    }

    /// Get user by email address
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        match self {
            Self::Memory(store) => store.get_user_by_email(email).await,
            Self::Sqlite(store) => store.get_user_by_email(email).await,
        }
    }

    /// Create a role with scoped identity `(name, guard, tenant)`
    ///
    /// # Errors
    ///
    /// Returns an error if the scoped identity is already taken
    pub async fn create_role(&self, role: &Role) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.create_role(role).await,
            Self::Sqlite(store) => store.create_role(role).await,
        }
    }

    /// Get role by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn get_role(&self, role_id: Uuid) -> AppResult<Option<Role>> {
        match self {
            Self::Memory(store) => store.get_role(role_id).await,
            Self::Sqlite(store) => store.get_role(role_id).await,
        }
    }

    /// Find a role by scoped identity
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn find_role(
        &self,
        name: &str,
        guard: &str,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Option<Role>> {
        match self {
            Self::Memory(store) => store.find_role(name, guard, tenant_id).await,
            Self::Sqlite(store) => store.find_role(name, guard, tenant_id).await,
        }
    }

    /// Create a permission
    ///
    /// # Errors
    ///
    /// Returns an error if `(name, guard)` is already taken
    pub async fn create_permission(&self, permission: &Permission) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.create_permission(permission).await,
            Self::Sqlite(store) => store.create_permission(permission).await,
        }
    }

    /// Find a permission by `(name, guard)`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn find_permission(&self, name: &str, guard: &str) -> AppResult<Option<Permission>> {
        match self {
            Self::Memory(store) => store.find_permission(name, guard).await,
            Self::Sqlite(store) => store.find_permission(name, guard).await,
        }
    }

    /// Assign a role to a user
    ///
    /// # Errors
    ///
    /// Returns an error if the role does not exist
    pub async fn assign_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.assign_role_to_user(user_id, role_id).await,
            Self::Sqlite(store) => store.assign_role_to_user(user_id, role_id).await,
        }
    }

    /// Revoke a role from a user
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn revoke_role_from_user(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.revoke_role_from_user(user_id, role_id).await,
            Self::Sqlite(store) => store.revoke_role_from_user(user_id, role_id).await,
        }
    }

    /// Grant a permission to a role
    ///
    /// # Errors
    ///
    /// Returns an error if the permission does not exist
    pub async fn grant_permission_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.grant_permission_to_role(role_id, permission_id).await,
            Self::Sqlite(store) => store.grant_permission_to_role(role_id, permission_id).await,
        }
    }

    /// Revoke a permission from a role
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn revoke_permission_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        match self {
            Self::Memory(store) => {
                store
                    .revoke_permission_from_role(role_id, permission_id)
                    .await
            }
            Self::Sqlite(store) => {
                store
                    .revoke_permission_from_role(role_id, permission_id)
                    .await
            }
        }
    }

    /// Grant a permission directly to a user
    ///
    /// # Errors
    ///
    /// Returns an error if the permission does not exist
    pub async fn grant_permission_to_user(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.grant_permission_to_user(user_id, permission_id).await,
            Self::Sqlite(store) => store.grant_permission_to_user(user_id, permission_id).await,
        }
    }

    /// Revoke a directly granted permission from a user
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn revoke_permission_from_user(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        match self {
            Self::Memory(store) => {
                store
                    .revoke_permission_from_user(user_id, permission_id)
                    .await
            }
            Self::Sqlite(store) => {
                store
                    .revoke_permission_from_user(user_id, permission_id)
                    .await
            }
        }
    }

    /// Roles assigned to a user within the given tenant boundary
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn roles_for_user(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Vec<Role>> {
        match self {
            Self::Memory(store) => store.roles_for_user(user_id, tenant_id).await,
            Self::Sqlite(store) => store.roles_for_user(user_id, tenant_id).await,
        }
    }

    /// Permissions granted to a role
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn permissions_for_role(&self, role_id: Uuid) -> AppResult<Vec<Permission>> {
        match self {
            Self::Memory(store) => store.permissions_for_role(role_id).await,
            Self::Sqlite(store) => store.permissions_for_role(role_id).await,
        }
    }

    /// Permissions granted directly to a user
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn direct_permissions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Permission>> {
        match self {
            Self::Memory(store) => store.direct_permissions_for_user(user_id).await,
            Self::Sqlite(store) => store.direct_permissions_for_user(user_id).await,
        }
    }

    /// Users currently assigned the role
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn users_with_role(&self, role_id: Uuid) -> AppResult<Vec<User>> {
        match self {
            Self::Memory(store) => store.users_with_role(role_id).await,
            Self::Sqlite(store) => store.users_with_role(role_id).await,
        }
    }

    /// Whether the user currently holds the named global role
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn user_holds_global_role(&self, user_id: Uuid, role_name: &str) -> AppResult<bool> {
        match self {
            Self::Memory(store) => store.user_holds_global_role(user_id, role_name).await,
            Self::Sqlite(store) => store.user_holds_global_role(user_id, role_name).await,
        }
    }
}
