// ABOUTME: Tenant context lifecycle with RAII teardown and lifecycle events
// ABOUTME: Scoped context travels with the request, never through global state

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! # Tenant Context
//!
//! A [`ScopedContext`] binds an authenticated user to at most one tenant for
//! the duration of a request. It is installed as a request extension and torn
//! down by a [`ContextGuard`] whose `Drop` impl runs on success, error, and
//! cancellation alike, so no context ever leaks across requests.
//!
//! Lifecycle transitions are published on a [`ContextBus`] so operational
//! tooling can observe installs and teardowns. The bus also keeps a live count
//! of installed contexts; a non-zero count between requests indicates a
//! teardown bug.

use crate::errors::{AppError, AppResult};
use crate::models::{Tenant, User};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Immutable snapshot of the tenant a request operates under
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    settings: Value,
}

impl TenantContext {
    /// Build a context from an active tenant record
    ///
    /// # Errors
    ///
    /// Returns `TenantInactive` if the tenant is deactivated or soft-deleted
    pub fn from_tenant(tenant: &Tenant) -> AppResult<Self> {
        if !tenant.is_active || tenant.deleted_at.is_some() {
            return Err(AppError::tenant_inactive(tenant.id));
        }
        Ok(Self {
            tenant_id: tenant.id,
            tenant_name: tenant.name.clone(),
            settings: tenant.settings.clone(),
        })
    }

    /// Look up a tenant setting by dotted path, e.g. `"billing.plan"`
    #[must_use]
    pub fn setting(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.settings, |node, segment| node.get(segment))
    }

    /// Whether a boolean feature flag is enabled in the settings document
    ///
    /// Missing or non-boolean values read as disabled.
    #[must_use]
    pub fn feature_enabled(&self, path: &str) -> bool {
        self.setting(path).and_then(Value::as_bool) == Some(true)
    }
}

/// Per-request context: the authenticated user plus their tenant binding
///
/// `tenant` is `None` for users not bound to any tenant. Such requests pass
/// authentication but fail authorization unless the user holds the reserved
/// global super-admin role.
#[derive(Debug, Clone)]
pub struct ScopedContext {
    pub user: User,
    pub tenant: Option<TenantContext>,
    /// Whether the user held the reserved global role when the context was
    /// installed. Informational only; authorization re-checks on every call.
    pub super_admin: bool,
}

impl ScopedContext {
    #[must_use]
    pub fn new(user: User, tenant: Option<TenantContext>, super_admin: bool) -> Self {
        Self {
            user,
            tenant,
            super_admin,
        }
    }

    /// The bound tenant id, if any
    #[must_use]
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant.as_ref().map(|t| t.tenant_id)
    }
}

/// Context lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextEvent {
    /// A context was installed for a request
    Installed {
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    },
    /// A context was torn down (success, error, or cancellation)
    Cleared {
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    },
}

/// Broadcast bus for context lifecycle events
///
/// Keeps a live gauge of installed contexts. Subscribers that fall behind
/// lose events; the gauge is always accurate.
pub struct ContextBus {
    sender: broadcast::Sender<ContextEvent>,
    active: AtomicI64,
}

impl ContextBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            active: AtomicI64::new(0),
        }
    }

    /// Subscribe to lifecycle events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.sender.subscribe()
    }

    /// Number of currently installed contexts
    #[must_use]
    pub fn active_contexts(&self) -> i64 {
        self.active.load(Ordering::SeqCst)
    }

    fn publish(&self, event: ContextEvent) {
        // Send fails only when nobody is subscribed, which is fine
        let _ = self.sender.send(event);
    }
}

impl Default for ContextBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// RAII guard tying context teardown to scope exit
///
/// Created by the context middleware after the tenant checks pass. Dropping
/// the guard publishes `Cleared` and decrements the active gauge, whether the
/// request finished, errored, or was cancelled mid-flight.
pub struct ContextGuard {
    bus: Arc<ContextBus>,
    user_id: Uuid,
    tenant_id: Option<Uuid>,
}

impl ContextGuard {
    /// Install a context: publishes `Installed` and bumps the active gauge
    #[must_use]
    pub fn install(bus: Arc<ContextBus>, context: &ScopedContext) -> Self {
        let user_id = context.user.id;
        let tenant_id = context.tenant_id();
        bus.active.fetch_add(1, Ordering::SeqCst);
        bus.publish(ContextEvent::Installed { user_id, tenant_id });
        tracing::debug!(
            user_id = %user_id,
            tenant_id = ?tenant_id,
            "Scoped context installed"
        );
        Self {
            bus,
            user_id,
            tenant_id,
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.bus.active.fetch_sub(1, Ordering::SeqCst);
        self.bus.publish(ContextEvent::Cleared {
            user_id: self.user_id,
            tenant_id: self.tenant_id,
        });
        tracing::debug!(
            user_id = %self.user_id,
            tenant_id = ?self.tenant_id,
            "Scoped context cleared"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::models::Tenant;

    fn active_tenant() -> Tenant {
        Tenant::new("Acme", "acme")
    }

    #[test]
    fn context_from_active_tenant() {
        let tenant = active_tenant();
        let ctx = TenantContext::from_tenant(&tenant).unwrap();
        assert_eq!(ctx.tenant_id, tenant.id);
        assert_eq!(ctx.tenant_name, "Acme");
    }

    #[test]
    fn settings_lookup_and_feature_flags() {
        let mut tenant = active_tenant();
        tenant.settings = serde_json::json!({
            "billing": { "plan": "pro" },
            "features": { "match_reports": true, "beta_stats": false }
        });
        let ctx = TenantContext::from_tenant(&tenant).unwrap();
        assert_eq!(
            ctx.setting("billing.plan"),
            Some(&serde_json::json!("pro"))
        );
        assert!(ctx.feature_enabled("features.match_reports"));
        assert!(!ctx.feature_enabled("features.beta_stats"));
        assert!(!ctx.feature_enabled("features.missing"));
    }

    #[test]
    fn context_rejects_inactive_tenant() {
        let mut tenant = active_tenant();
        tenant.is_active = false;
        let err = TenantContext::from_tenant(&tenant).unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::TenantInactive);
    }

    #[test]
    fn context_rejects_soft_deleted_tenant() {
        let mut tenant = active_tenant();
        tenant.deleted_at = Some(chrono::Utc::now());
        assert!(TenantContext::from_tenant(&tenant).is_err());
    }

    #[test]
    fn guard_drop_clears_context() {
        let bus = Arc::new(ContextBus::default());
        let user = User::new("ada@example.com", "Ada", Uuid::new_v4());
        let ctx = ScopedContext::new(user, None, false);

        let mut rx = bus.subscribe();
        {
            let _guard = ContextGuard::install(Arc::clone(&bus), &ctx);
            assert_eq!(bus.active_contexts(), 1);
        }
        assert_eq!(bus.active_contexts(), 0);

        assert!(matches!(
            rx.try_recv().unwrap(),
            ContextEvent::Installed { .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ContextEvent::Cleared { .. }
        ));
    }

    #[test]
    fn guard_clears_on_panic_unwind() {
        let bus = Arc::new(ContextBus::default());
        let user = User::new("ada@example.com", "Ada", Uuid::new_v4());
        let ctx = ScopedContext::new(user, None, false);

        let bus_clone = Arc::clone(&bus);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = ContextGuard::install(bus_clone, &ctx);
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert_eq!(bus.active_contexts(), 0);
    }
}
