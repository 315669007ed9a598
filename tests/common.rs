// ABOUTME: Shared test helpers for integration tests
// ABOUTME: Resource setup and tenant seeding utilities

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use anyhow::Result;
use clubdesk::config::DEFAULT_GUARD;
use clubdesk::models::{Permission, Role, Tenant, User};
use clubdesk::resources::ServerResources;
use std::sync::Arc;

/// A fully wired tenant: one user holding one role carrying one permission
pub struct SeededTenant {
    pub tenant: Tenant,
    pub user: User,
    pub role: Role,
    pub permission: Permission,
}

/// Create engine resources backed by in-memory store and cache
pub async fn setup() -> Result<Arc<ServerResources>> {
    Ok(Arc::new(ServerResources::for_testing().await?))
}

/// Seed a tenant with a `manager` role granted `permission_name`, assigned to
/// a fresh user
pub async fn seed_tenant(
    resources: &ServerResources,
    slug: &str,
    permission_name: &str,
) -> Result<SeededTenant> {
    let identity = &resources.identity;
    let tenant = identity.create_tenant(slug, slug).await?;
    let user = identity
        .create_user(&format!("user@{slug}.test"), "Test User", tenant.id)
        .await?;
    let role = identity.create_role("manager", DEFAULT_GUARD, tenant.id).await?;
    let permission = match resources
        .store
        .find_permission(permission_name, DEFAULT_GUARD)
        .await?
    {
        Some(existing) => existing,
        None => identity.create_permission(permission_name, DEFAULT_GUARD).await?,
    };
    identity
        .grant_permission_to_role(role.id, permission.id)
        .await?;
    identity.assign_role(user.id, role.id).await?;

    Ok(SeededTenant {
        tenant,
        user,
        role,
        permission,
    })
}

/// Create an unscoped user holding the reserved global super-admin role
pub async fn seed_super_admin(resources: &ServerResources) -> Result<User> {
    let identity = &resources.identity;
    let user = identity
        .create_unscoped_user("ops@clubdesk.test", "Operator")
        .await?;
    let role_name = resources.config.super_admin_role_name.clone();
    let role = match resources
        .store
        .find_role(&role_name, DEFAULT_GUARD, None)
        .await?
    {
        Some(existing) => existing,
        None => identity.create_global_role(&role_name, DEFAULT_GUARD).await?,
    };
    identity.assign_role(user.id, role.id).await?;
    Ok(user)
}
