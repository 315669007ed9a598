// ABOUTME: Integration tests for the identity service write path
// ABOUTME: Every mutation must be visible to the next check, never stale

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

mod common;

use anyhow::Result;
use clubdesk::config::DEFAULT_GUARD;
use clubdesk::errors::ErrorCode;
use serde_json::json;

#[tokio::test]
async fn revocation_is_visible_to_the_next_check() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;

    // Warm the cache
    assert!(
        resources
            .resolver
            .check(seeded.user.id, Some(seeded.tenant.id), "posts.view")
            .await?
    );

    resources
        .identity
        .revoke_role(seeded.user.id, seeded.role.id)
        .await?;

    assert!(
        !resources
            .resolver
            .check(seeded.user.id, Some(seeded.tenant.id), "posts.view")
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn assignment_is_visible_to_the_next_check() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;
    let newcomer = resources
        .identity
        .create_user("new@acme.test", "Newcomer", seeded.tenant.id)
        .await?;

    // Warm a negative resolution first
    assert!(
        !resources
            .resolver
            .check(newcomer.id, Some(seeded.tenant.id), "posts.view")
            .await?
    );

    resources.identity.assign_role(newcomer.id, seeded.role.id).await?;

    assert!(
        resources
            .resolver
            .check(newcomer.id, Some(seeded.tenant.id), "posts.view")
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn role_grant_change_invalidates_every_holder() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;
    let second = resources
        .identity
        .create_user("second@acme.test", "Second", seeded.tenant.id)
        .await?;
    resources.identity.assign_role(second.id, seeded.role.id).await?;

    // Warm both users' resolutions
    for user_id in [seeded.user.id, second.id] {
        assert!(
            !resources
                .resolver
                .check(user_id, Some(seeded.tenant.id), "reports.run")
                .await?
        );
    }

    let reports = resources
        .identity
        .create_permission("reports.run", DEFAULT_GUARD)
        .await?;
    resources
        .identity
        .grant_permission_to_role(seeded.role.id, reports.id)
        .await?;

    for user_id in [seeded.user.id, second.id] {
        assert!(
            resources
                .resolver
                .check(user_id, Some(seeded.tenant.id), "reports.run")
                .await?
        );
    }
    Ok(())
}

#[tokio::test]
async fn direct_grant_and_revoke_round_trip() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;
    let extra = resources
        .identity
        .create_permission("audit.read", DEFAULT_GUARD)
        .await?;

    resources
        .identity
        .grant_permission_to_user(seeded.user.id, extra.id)
        .await?;
    assert!(
        resources
            .resolver
            .check(seeded.user.id, Some(seeded.tenant.id), "audit.read")
            .await?
    );

    resources
        .identity
        .revoke_permission_from_user(seeded.user.id, extra.id)
        .await?;
    assert!(
        !resources
            .resolver
            .check(seeded.user.id, Some(seeded.tenant.id), "audit.read")
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_role_identity_is_rejected_within_a_tenant() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;

    let err = resources
        .identity
        .create_role("manager", DEFAULT_GUARD, seeded.tenant.id)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected duplicate role rejection"))?;
    assert_eq!(err.code, ErrorCode::ResourceAlreadyExists);

    // Same name in a different tenant is a distinct role
    let other = resources.identity.create_tenant("globex", "globex").await?;
    resources
        .identity
        .create_role("manager", DEFAULT_GUARD, other.id)
        .await?;
    Ok(())
}

#[tokio::test]
async fn global_role_grants_do_not_cross_tenant_boundaries() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;

    let auditor = resources
        .identity
        .create_global_role("auditor", DEFAULT_GUARD)
        .await?;
    let audit = resources
        .identity
        .create_permission("audit.read", DEFAULT_GUARD)
        .await?;
    resources
        .identity
        .grant_permission_to_role(auditor.id, audit.id)
        .await?;
    resources
        .identity
        .assign_role(seeded.user.id, auditor.id)
        .await?;

    // Only the reserved role reaches across tenants
    assert!(
        !resources
            .resolver
            .check(seeded.user.id, Some(seeded.tenant.id), "audit.read")
            .await?
    );
    let held = resources
        .resolver
        .resolve(seeded.user.id, Some(seeded.tenant.id))
        .await?;
    assert!(!held.contains("audit.read"));

    // Revoking from the role keeps the answer consistent, never stale
    resources
        .identity
        .revoke_permission_from_role(auditor.id, audit.id)
        .await?;
    assert!(
        !resources
            .resolver
            .check(seeded.user.id, Some(seeded.tenant.id), "audit.read")
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn reserved_role_grant_changes_invalidate_every_holder() -> Result<()> {
    let resources = common::setup().await?;
    let admin = common::seed_super_admin(&resources).await?;
    let role = resources
        .store
        .find_role(&resources.config.super_admin_role_name, DEFAULT_GUARD, None)
        .await?
        .ok_or_else(|| anyhow::anyhow!("global role missing"))?;
    let audit = resources
        .identity
        .create_permission("audit.read", DEFAULT_GUARD)
        .await?;

    // Warm the cached resolution in the admin's namespace
    assert!(!resources.resolver.resolve(admin.id, None).await?.contains("audit.read"));

    resources
        .identity
        .grant_permission_to_role(role.id, audit.id)
        .await?;
    assert!(resources.resolver.resolve(admin.id, None).await?.contains("audit.read"));

    resources
        .identity
        .revoke_permission_from_role(role.id, audit.id)
        .await?;
    assert!(!resources.resolver.resolve(admin.id, None).await?.contains("audit.read"));
    Ok(())
}

#[tokio::test]
async fn role_assignment_invalidates_in_the_users_namespace() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;
    let auditor = resources
        .identity
        .create_global_role("auditor", DEFAULT_GUARD)
        .await?;

    // Warm the resolution cached under the user's tenant namespace
    resources
        .resolver
        .resolve(seeded.user.id, Some(seeded.tenant.id))
        .await?;

    // Assigning a role of any scope must drop that entry, not one keyed on
    // the role's own scope
    resources
        .identity
        .assign_role(seeded.user.id, auditor.id)
        .await?;

    resources
        .resolver
        .resolve(seeded.user.id, Some(seeded.tenant.id))
        .await?;
    let (_, misses) = resources.resolver.metrics().snapshot();
    assert_eq!(misses, 2);
    Ok(())
}

#[tokio::test]
async fn settings_update_flushes_the_tenant_namespace() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;

    // Warm a cached resolution and a settings entry in the tenant namespace
    resources
        .resolver
        .resolve(seeded.user.id, Some(seeded.tenant.id))
        .await?;
    let handle = resources.cache_for(seeded.tenant.id);
    handle.put("settings-snapshot", &json!({"plan": "free"})).await?;

    resources
        .identity
        .update_tenant_settings(seeded.tenant.id, json!({"billing": {"plan": "pro"}}))
        .await?;

    // No reader started after the update can observe pre-update values
    assert!(
        handle
            .get::<serde_json::Value>("settings-snapshot")
            .await?
            .is_none()
    );

    // The cached resolution was flushed with the namespace
    resources
        .resolver
        .resolve(seeded.user.id, Some(seeded.tenant.id))
        .await?;
    let (_, misses) = resources.resolver.metrics().snapshot();
    assert_eq!(misses, 2);

    let tenant = resources
        .store
        .get_tenant(seeded.tenant.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tenant missing"))?;
    assert_eq!(tenant.setting("billing.plan"), Some(&json!("pro")));
    Ok(())
}

#[tokio::test]
async fn soft_delete_retains_data_and_revokes_access() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;

    resources.identity.soft_delete_tenant(seeded.tenant.id).await?;

    let tenant = resources
        .store
        .get_tenant(seeded.tenant.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("soft-deleted tenant should remain"))?;
    assert!(!tenant.is_active);
    assert!(tenant.deleted_at.is_some());
    Ok(())
}

#[tokio::test]
async fn hard_delete_cascades_to_users_and_roles() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;

    resources.identity.hard_delete_tenant(seeded.tenant.id).await?;

    assert!(resources.store.get_tenant(seeded.tenant.id).await?.is_none());
    assert!(resources.store.get_user(seeded.user.id).await?.is_none());
    assert!(resources.store.get_role(seeded.role.id).await?.is_none());
    // Permissions are not tenant-owned and survive
    assert!(
        resources
            .store
            .find_permission("posts.view", DEFAULT_GUARD)
            .await?
            .is_some()
    );
    Ok(())
}
