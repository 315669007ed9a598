// ABOUTME: Integration tests for the tenant-namespaced cache handle
// ABOUTME: Covers isolation, namespace flush scoping, counters, and remember

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use anyhow::Result;
use clubdesk::cache::{Cache, CacheConfig, TenantCache};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Payload {
    value: String,
}

async fn test_cache() -> Result<Cache> {
    let config = CacheConfig {
        redis_url: None,
        // Disable in tests to avoid tokio runtime conflicts
        enable_background_cleanup: false,
        ..CacheConfig::default()
    };
    Ok(Cache::new(config).await?)
}

fn handle_for(cache: &Cache, tenant_id: Uuid) -> TenantCache {
    TenantCache::new(cache.clone(), "clubdesk", tenant_id, None)
}

#[tokio::test]
async fn same_logical_key_is_isolated_per_tenant() -> Result<()> {
    let cache = test_cache().await?;
    let a = handle_for(&cache, Uuid::new_v4());
    let b = handle_for(&cache, Uuid::new_v4());

    a.put("settings", &Payload { value: "a".into() }).await?;
    b.put("settings", &Payload { value: "b".into() }).await?;

    let from_a: Option<Payload> = a.get("settings").await?;
    let from_b: Option<Payload> = b.get("settings").await?;
    assert_eq!(from_a.map(|p| p.value).as_deref(), Some("a"));
    assert_eq!(from_b.map(|p| p.value).as_deref(), Some("b"));
    Ok(())
}

#[tokio::test]
async fn flush_clears_only_current_namespace() -> Result<()> {
    let cache = test_cache().await?;
    let a = handle_for(&cache, Uuid::new_v4());
    let b = handle_for(&cache, Uuid::new_v4());

    a.put("k1", &Payload { value: "a1".into() }).await?;
    a.put("k2", &Payload { value: "a2".into() }).await?;
    b.put("k1", &Payload { value: "b1".into() }).await?;

    let removed = a.flush().await?;
    assert_eq!(removed, 2);

    assert!(a.get::<Payload>("k1").await?.is_none());
    assert!(a.get::<Payload>("k2").await?.is_none());
    // The other tenant's entry survives
    assert!(b.get::<Payload>("k1").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn global_namespace_is_shared() -> Result<()> {
    let cache = test_cache().await?;
    let g1 = TenantCache::global(cache.clone(), "clubdesk", None);
    let g2 = TenantCache::global(cache, "clubdesk", None);

    g1.put("announcement", &Payload { value: "hi".into() }).await?;
    let seen: Option<Payload> = g2.get("announcement").await?;
    assert_eq!(seen.map(|p| p.value).as_deref(), Some("hi"));
    Ok(())
}

#[tokio::test]
async fn tenant_flush_leaves_global_namespace_alone() -> Result<()> {
    let cache = test_cache().await?;
    let tenant = handle_for(&cache, Uuid::new_v4());
    let global = TenantCache::global(cache, "clubdesk", None);

    global.put("shared", &Payload { value: "g".into() }).await?;
    tenant.put("shared", &Payload { value: "t".into() }).await?;

    tenant.flush().await?;
    assert!(global.get::<Payload>("shared").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn remember_computes_once_then_serves_cached() -> Result<()> {
    let cache = test_cache().await?;
    let handle = handle_for(&cache, Uuid::new_v4());

    let first = handle
        .remember("expensive", || async { Ok(Payload { value: "v1".into() }) })
        .await?;
    assert_eq!(first.value, "v1");

    // Second compute would produce a different value; cached one wins
    let second = handle
        .remember("expensive", || async { Ok(Payload { value: "v2".into() }) })
        .await?;
    assert_eq!(second.value, "v1");
    Ok(())
}

#[tokio::test]
async fn counters_increment_and_decrement() -> Result<()> {
    let cache = test_cache().await?;
    let handle = handle_for(&cache, Uuid::new_v4());

    assert_eq!(handle.increment("active-sessions", 1).await?, 1);
    assert_eq!(handle.increment("active-sessions", 4).await?, 5);
    assert_eq!(handle.decrement("active-sessions", 2).await?, 3);
    Ok(())
}

#[tokio::test]
async fn entries_honor_explicit_ttl() -> Result<()> {
    let cache = test_cache().await?;
    let handle = handle_for(&cache, Uuid::new_v4());

    handle
        .put_with_ttl("ephemeral", &Payload { value: "x".into() }, Some(Duration::from_millis(30)))
        .await?;
    assert!(handle.get::<Payload>("ephemeral").await?.is_some());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(handle.get::<Payload>("ephemeral").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn forget_removes_single_entry() -> Result<()> {
    let cache = test_cache().await?;
    let handle = handle_for(&cache, Uuid::new_v4());

    handle.put("a", &Payload { value: "1".into() }).await?;
    handle.put("b", &Payload { value: "2".into() }).await?;

    handle.forget("a").await?;
    assert!(handle.get::<Payload>("a").await?.is_none());
    assert!(handle.get::<Payload>("b").await?.is_some());
    Ok(())
}
