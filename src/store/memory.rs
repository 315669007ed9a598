// ABOUTME: In-memory identity store backed by DashMap tables
// ABOUTME: Used by tests and single-process development deployments
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use super::IdentityStore;
use crate::errors::{AppError, AppResult};
use crate::models::{Permission, Role, Tenant, User};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory identity store
///
/// Concurrent maps per table; assignment relations are adjacency sets keyed by
/// the owning entity. Mutations touch one map entry at a time, which is enough
/// write serialization for the engine's rare-write workload.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tenants: Arc<DashMap<Uuid, Tenant>>,
    users: Arc<DashMap<Uuid, User>>,
    roles: Arc<DashMap<Uuid, Role>>,
    permissions: Arc<DashMap<Uuid, Permission>>,
    /// user_id -> assigned role ids
    user_roles: Arc<DashMap<Uuid, HashSet<Uuid>>>,
    /// role_id -> granted permission ids
    role_permissions: Arc<DashMap<Uuid, HashSet<Uuid>>>,
    /// user_id -> directly granted permission ids
    user_permissions: Arc<DashMap<Uuid, HashSet<Uuid>>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new_empty() -> Self {
        Self::default()
    }

    fn role_identity_taken(&self, role: &Role) -> bool {
        self.roles.iter().any(|existing| {
            existing.name == role.name
                && existing.guard == role.guard
                && existing.tenant_id == role.tenant_id
        })
    }

    fn remove_role_entry(&self, role_id: Uuid) {
        self.roles.remove(&role_id);
        self.role_permissions.remove(&role_id);
        for mut assigned in self.user_roles.iter_mut() {
            assigned.remove(&role_id);
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn new(_database_url: &str) -> AppResult<Self> {
        Ok(Self::default())
    }

    async fn migrate(&self) -> AppResult<()> {
        Ok(())
    }

    async fn create_tenant(&self, tenant: &Tenant) -> AppResult<()> {
        if self.tenants.contains_key(&tenant.id) {
            return Err(AppError::already_exists(format!("Tenant {}", tenant.id)));
        }
        self.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> AppResult<Option<Tenant>> {
        Ok(self.tenants.get(&tenant_id).map(|t| t.clone()))
    }

    async fn update_tenant_settings(
        &self,
        tenant_id: Uuid,
        settings: &serde_json::Value,
    ) -> AppResult<()> {
        let mut tenant = self
            .tenants
            .get_mut(&tenant_id)
            .ok_or_else(|| AppError::not_found(format!("Tenant {tenant_id}")))?;
        tenant.settings = settings.clone();
        tenant.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn set_tenant_active(&self, tenant_id: Uuid, is_active: bool) -> AppResult<()> {
        let mut tenant = self
            .tenants
            .get_mut(&tenant_id)
            .ok_or_else(|| AppError::not_found(format!("Tenant {tenant_id}")))?;
        tenant.is_active = is_active;
        tenant.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn soft_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        let mut tenant = self
            .tenants
            .get_mut(&tenant_id)
            .ok_or_else(|| AppError::not_found(format!("Tenant {tenant_id}")))?;
        tenant.is_active = false;
        tenant.deleted_at = Some(chrono::Utc::now());
        tenant.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn hard_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        if self.tenants.remove(&tenant_id).is_none() {
            return Err(AppError::not_found(format!("Tenant {tenant_id}")));
        }

        // Cascade: users of the tenant and their assignments
        let tenant_users: Vec<Uuid> = self
            .users
            .iter()
            .filter(|u| u.tenant_id == Some(tenant_id))
            .map(|u| u.id)
            .collect();
        for user_id in tenant_users {
            self.users.remove(&user_id);
            self.user_roles.remove(&user_id);
            self.user_permissions.remove(&user_id);
        }

        // Cascade: tenant-scoped roles and their grants
        let tenant_roles: Vec<Uuid> = self
            .roles
            .iter()
            .filter(|r| r.tenant_id == Some(tenant_id))
            .map(|r| r.id)
            .collect();
        for role_id in tenant_roles {
            self.remove_role_entry(role_id);
        }

        Ok(())
    }

    async fn create_user(&self, user: &User) -> AppResult<()> {
        if self
            .users
            .iter()
            .any(|existing| existing.email == user.email)
        {
            return Err(AppError::already_exists(format!("User {}", user.email)));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone()))
    }

    async fn create_role(&self, role: &Role) -> AppResult<()> {
        if self.role_identity_taken(role) {
            return Err(AppError::already_exists(format!(
                "Role {}/{} in tenant {:?}",
                role.name, role.guard, role.tenant_id
            )));
        }
        self.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn get_role(&self, role_id: Uuid) -> AppResult<Option<Role>> {
        Ok(self.roles.get(&role_id).map(|r| r.clone()))
    }

    async fn find_role(
        &self,
        name: &str,
        guard: &str,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .iter()
            .find(|r| r.name == name && r.guard == guard && r.tenant_id == tenant_id)
            .map(|r| r.clone()))
    }

    async fn create_permission(&self, permission: &Permission) -> AppResult<()> {
        if self
            .permissions
            .iter()
            .any(|p| p.name == permission.name && p.guard == permission.guard)
        {
            return Err(AppError::already_exists(format!(
                "Permission {}/{}",
                permission.name, permission.guard
            )));
        }
        self.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn find_permission(&self, name: &str, guard: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .iter()
            .find(|p| p.name == name && p.guard == guard)
            .map(|p| p.clone()))
    }

    async fn assign_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        if !self.roles.contains_key(&role_id) {
            return Err(AppError::not_found(format!("Role {role_id}")));
        }
        self.user_roles.entry(user_id).or_default().insert(role_id);
        Ok(())
    }

    async fn revoke_role_from_user(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        if let Some(mut assigned) = self.user_roles.get_mut(&user_id) {
            assigned.remove(&role_id);
        }
        Ok(())
    }

    async fn grant_permission_to_role(&self, role_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        if !self.permissions.contains_key(&permission_id) {
            return Err(AppError::not_found(format!("Permission {permission_id}")));
        }
        self.role_permissions
            .entry(role_id)
            .or_default()
            .insert(permission_id);
        Ok(())
    }

    async fn revoke_permission_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        if let Some(mut granted) = self.role_permissions.get_mut(&role_id) {
            granted.remove(&permission_id);
        }
        Ok(())
    }

    async fn grant_permission_to_user(&self, user_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        if !self.permissions.contains_key(&permission_id) {
            return Err(AppError::not_found(format!("Permission {permission_id}")));
        }
        self.user_permissions
            .entry(user_id)
            .or_default()
            .insert(permission_id);
        Ok(())
    }

    async fn revoke_permission_from_user(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        if let Some(mut granted) = self.user_permissions.get_mut(&user_id) {
            granted.remove(&permission_id);
        }
        Ok(())
    }

    async fn roles_for_user(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> AppResult<Vec<Role>> {
        let Some(assigned) = self.user_roles.get(&user_id) else {
            return Ok(Vec::new());
        };

        let roles = assigned
            .iter()
            .filter_map(|role_id| self.roles.get(role_id).map(|r| r.clone()))
            .filter(|role| match tenant_id {
                Some(tenant_id) => role.visible_in_tenant(tenant_id),
                // No tenant boundary: only global roles are visible
                None => !role.tenant_scoped,
            })
            .collect();
        Ok(roles)
    }

    async fn permissions_for_role(&self, role_id: Uuid) -> AppResult<Vec<Permission>> {
        let Some(granted) = self.role_permissions.get(&role_id) else {
            return Ok(Vec::new());
        };
        Ok(granted
            .iter()
            .filter_map(|id| self.permissions.get(id).map(|p| p.clone()))
            .collect())
    }

    async fn direct_permissions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Permission>> {
        let Some(granted) = self.user_permissions.get(&user_id) else {
            return Ok(Vec::new());
        };
        Ok(granted
            .iter()
            .filter_map(|id| self.permissions.get(id).map(|p| p.clone()))
            .collect())
    }

    async fn users_with_role(&self, role_id: Uuid) -> AppResult<Vec<User>> {
        Ok(self
            .user_roles
            .iter()
            .filter(|entry| entry.value().contains(&role_id))
            .filter_map(|entry| self.users.get(entry.key()).map(|u| u.clone()))
            .collect())
    }

    async fn user_holds_global_role(&self, user_id: Uuid, role_name: &str) -> AppResult<bool> {
        let Some(assigned) = self.user_roles.get(&user_id) else {
            return Ok(false);
        };
        Ok(assigned.iter().any(|role_id| {
            self.roles
                .get(role_id)
                .is_some_and(|role| !role.tenant_scoped && role.name == role_name)
        }))
    }
}
