// ABOUTME: Integration tests for scoped context lifecycle and teardown
// ABOUTME: Context must be gone after success, failure, and cancellation

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

mod common;

use anyhow::Result;
use clubdesk::errors::ErrorCode;
use clubdesk::tenant::{ContextBus, ContextEvent, ContextGuard, ScopedContext, TenantContext};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn install_rejects_inactive_tenant() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;
    resources.identity.deactivate_tenant(seeded.tenant.id).await?;

    let tenant = resources
        .store
        .get_tenant(seeded.tenant.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tenant missing"))?;
    let err = TenantContext::from_tenant(&tenant)
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected inactive rejection"))?;
    assert_eq!(err.code, ErrorCode::TenantInactive);

    resources.identity.reactivate_tenant(seeded.tenant.id).await?;
    let tenant = resources
        .store
        .get_tenant(seeded.tenant.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tenant missing"))?;
    assert!(TenantContext::from_tenant(&tenant).is_ok());
    Ok(())
}

#[tokio::test]
async fn guard_publishes_paired_lifecycle_events() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;
    let tenant = resources
        .store
        .get_tenant(seeded.tenant.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tenant missing"))?;
    let context = ScopedContext::new(
        seeded.user.clone(),
        Some(TenantContext::from_tenant(&tenant)?),
        false,
    );

    let bus = Arc::new(ContextBus::default());
    let mut rx = bus.subscribe();
    {
        let _guard = ContextGuard::install(Arc::clone(&bus), &context);
        assert_eq!(bus.active_contexts(), 1);
    }
    assert_eq!(bus.active_contexts(), 0);

    let installed = rx.try_recv()?;
    let cleared = rx.try_recv()?;
    assert_eq!(
        installed,
        ContextEvent::Installed {
            user_id: seeded.user.id,
            tenant_id: Some(seeded.tenant.id),
        }
    );
    assert_eq!(
        cleared,
        ContextEvent::Cleared {
            user_id: seeded.user.id,
            tenant_id: Some(seeded.tenant.id),
        }
    );
    Ok(())
}

#[tokio::test]
async fn cancelled_task_still_tears_down_context() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;
    let context = ScopedContext::new(seeded.user, None, false);

    let bus = Arc::new(ContextBus::default());
    let task_bus = Arc::clone(&bus);
    let handle = tokio::spawn(async move {
        let _guard = ContextGuard::install(task_bus, &context);
        // Park until aborted; the guard must still run
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    // Wait for the install to land
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(bus.active_contexts(), 1);

    handle.abort();
    let _ = handle.await;
    assert_eq!(bus.active_contexts(), 0);
    Ok(())
}

#[tokio::test]
async fn failing_work_between_install_and_teardown_still_clears() -> Result<()> {
    let resources = common::setup().await?;
    let seeded = common::seed_tenant(&resources, "acme", "posts.view").await?;
    let context = ScopedContext::new(seeded.user, None, false);
    let bus = Arc::new(ContextBus::default());

    let result: Result<(), anyhow::Error> = async {
        let _guard = ContextGuard::install(Arc::clone(&bus), &context);
        anyhow::bail!("handler failed");
    }
    .await;

    assert!(result.is_err());
    assert_eq!(bus.active_contexts(), 0);
    Ok(())
}
