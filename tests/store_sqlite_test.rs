// ABOUTME: Integration tests for the SQLite identity store backend
// ABOUTME: Schema, scoped uniqueness, tenant-filtered queries, and cascades

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use anyhow::Result;
use clubdesk::errors::ErrorCode;
use clubdesk::models::{Permission, Role, Tenant, User};
use clubdesk::store::Store;
use tempfile::TempDir;

async fn sqlite_store() -> Result<(Store, TempDir)> {
    let dir = TempDir::new()?;
    let url = format!("sqlite:{}/identity.db", dir.path().display());
    let store = Store::new(&url).await?;
    store.migrate().await?;
    Ok((store, dir))
}

#[tokio::test]
async fn round_trips_tenant_with_settings() -> Result<()> {
    let (store, _dir) = sqlite_store().await?;
    let mut tenant = Tenant::new("Acme", "acme");
    tenant.settings = serde_json::json!({"billing": {"plan": "pro"}});
    store.create_tenant(&tenant).await?;

    let loaded = store
        .get_tenant(tenant.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tenant missing"))?;
    assert_eq!(loaded.slug, "acme");
    assert!(loaded.is_active);
    assert_eq!(loaded.setting("billing.plan"), Some(&serde_json::json!("pro")));
    Ok(())
}

#[tokio::test]
async fn scoped_role_identity_is_unique_per_tenant() -> Result<()> {
    let (store, _dir) = sqlite_store().await?;
    let acme = Tenant::new("Acme", "acme");
    let globex = Tenant::new("Globex", "globex");
    store.create_tenant(&acme).await?;
    store.create_tenant(&globex).await?;

    store.create_role(&Role::scoped("manager", "api", acme.id)).await?;

    let err = store
        .create_role(&Role::scoped("manager", "api", acme.id))
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected duplicate rejection"))?;
    assert_eq!(err.code, ErrorCode::ResourceAlreadyExists);

    // Same identity under another tenant is fine, as is the global variant
    store.create_role(&Role::scoped("manager", "api", globex.id)).await?;
    store.create_role(&Role::global("manager", "api")).await?;
    Ok(())
}

#[tokio::test]
async fn roles_for_user_is_tenant_filtered() -> Result<()> {
    let (store, _dir) = sqlite_store().await?;
    let acme = Tenant::new("Acme", "acme");
    let globex = Tenant::new("Globex", "globex");
    store.create_tenant(&acme).await?;
    store.create_tenant(&globex).await?;

    let user = User::new("ada@acme.test", "Ada", acme.id);
    store.create_user(&user).await?;

    let acme_role = Role::scoped("manager", "api", acme.id);
    let globex_role = Role::scoped("manager", "api", globex.id);
    let global_role = Role::global("auditor", "api");
    for role in [&acme_role, &globex_role, &global_role] {
        store.create_role(role).await?;
        store.assign_role_to_user(user.id, role.id).await?;
    }

    let in_acme = store.roles_for_user(user.id, Some(acme.id)).await?;
    let mut names: Vec<(String, Option<uuid::Uuid>)> = in_acme
        .iter()
        .map(|r| (r.name.clone(), r.tenant_id))
        .collect();
    names.sort();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&("manager".to_owned(), Some(acme.id))));
    assert!(names.contains(&("auditor".to_owned(), None)));

    // No tenant boundary: only the global role is visible
    let unbounded = store.roles_for_user(user.id, None).await?;
    assert_eq!(unbounded.len(), 1);
    assert_eq!(unbounded[0].name, "auditor");
    Ok(())
}

#[tokio::test]
async fn users_with_role_lists_current_holders() -> Result<()> {
    let (store, _dir) = sqlite_store().await?;
    let acme = Tenant::new("Acme", "acme");
    store.create_tenant(&acme).await?;
    let ada = User::new("ada@acme.test", "Ada", acme.id);
    let grace = User::new("grace@acme.test", "Grace", acme.id);
    store.create_user(&ada).await?;
    store.create_user(&grace).await?;

    let role = Role::global("auditor", "api");
    store.create_role(&role).await?;
    store.assign_role_to_user(ada.id, role.id).await?;
    store.assign_role_to_user(grace.id, role.id).await?;

    let holders = store.users_with_role(role.id).await?;
    assert_eq!(holders.len(), 2);

    store.revoke_role_from_user(grace.id, role.id).await?;
    let holders = store.users_with_role(role.id).await?;
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].id, ada.id);
    Ok(())
}

#[tokio::test]
async fn user_holds_global_role_ignores_scoped_roles() -> Result<()> {
    let (store, _dir) = sqlite_store().await?;
    let acme = Tenant::new("Acme", "acme");
    store.create_tenant(&acme).await?;
    let user = User::new("ada@acme.test", "Ada", acme.id);
    store.create_user(&user).await?;

    let scoped = Role::scoped("super-admin", "api", acme.id);
    store.create_role(&scoped).await?;
    store.assign_role_to_user(user.id, scoped.id).await?;
    // A tenant-scoped role with the reserved name grants nothing globally
    assert!(!store.user_holds_global_role(user.id, "super-admin").await?);

    let global = Role::global("super-admin", "api");
    store.create_role(&global).await?;
    store.assign_role_to_user(user.id, global.id).await?;
    assert!(store.user_holds_global_role(user.id, "super-admin").await?);
    Ok(())
}

#[tokio::test]
async fn permission_resolution_queries_follow_grants() -> Result<()> {
    let (store, _dir) = sqlite_store().await?;
    let acme = Tenant::new("Acme", "acme");
    store.create_tenant(&acme).await?;
    let user = User::new("ada@acme.test", "Ada", acme.id);
    store.create_user(&user).await?;

    let role = Role::scoped("manager", "api", acme.id);
    store.create_role(&role).await?;
    let view = Permission::new("posts.view", "api");
    let export = Permission::new("posts.export", "api");
    store.create_permission(&view).await?;
    store.create_permission(&export).await?;

    store.grant_permission_to_role(role.id, view.id).await?;
    store.grant_permission_to_user(user.id, export.id).await?;

    let role_perms = store.permissions_for_role(role.id).await?;
    assert_eq!(role_perms.len(), 1);
    assert_eq!(role_perms[0].name, "posts.view");

    let direct = store.direct_permissions_for_user(user.id).await?;
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].name, "posts.export");

    store.revoke_permission_from_role(role.id, view.id).await?;
    assert!(store.permissions_for_role(role.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn soft_delete_marks_and_hard_delete_cascades() -> Result<()> {
    let (store, _dir) = sqlite_store().await?;
    let acme = Tenant::new("Acme", "acme");
    store.create_tenant(&acme).await?;
    let user = User::new("ada@acme.test", "Ada", acme.id);
    store.create_user(&user).await?;
    let role = Role::scoped("manager", "api", acme.id);
    store.create_role(&role).await?;
    store.assign_role_to_user(user.id, role.id).await?;

    store.soft_delete_tenant(acme.id).await?;
    let marked = store
        .get_tenant(acme.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("soft-deleted tenant should remain"))?;
    assert!(!marked.is_active);
    assert!(marked.deleted_at.is_some());
    assert!(store.get_user(user.id).await?.is_some());

    store.hard_delete_tenant(acme.id).await?;
    assert!(store.get_tenant(acme.id).await?.is_none());
    assert!(store.get_user(user.id).await?.is_none());
    assert!(store.get_role(role.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let (store, _dir) = sqlite_store().await?;
    let acme = Tenant::new("Acme", "acme");
    store.create_tenant(&acme).await?;
    store.create_user(&User::new("ada@acme.test", "Ada", acme.id)).await?;

    let err = store
        .create_user(&User::new("ada@acme.test", "Imposter", acme.id))
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected duplicate rejection"))?;
    assert_eq!(err.code, ErrorCode::ResourceAlreadyExists);
    Ok(())
}
