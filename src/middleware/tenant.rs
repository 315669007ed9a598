// ABOUTME: Context middleware binding the authenticated user to their tenant
// ABOUTME: Installs ScopedContext with RAII teardown across the handler

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! Context middleware
//!
//! Runs after authentication. Verifies the tenant binding in order: the user
//! must be bound to a tenant (or hold the reserved global role), the tenant
//! must exist, and it must be active. Only then is a [`ScopedContext`]
//! installed as a request extension.
//!
//! The context guard is held across `next.run`, so teardown happens when the
//! response completes, when a handler errors, and when the request future is
//! cancelled mid-flight.

use super::auth::AuthenticatedUser;
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::tenant::{ContextGuard, ScopedContext, TenantContext};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// Context middleware
///
/// # Errors
///
/// Returns `NoTenantBound` for users without a tenant binding (unless they
/// hold the reserved global role), `TenantInactive` for deactivated or
/// soft-deleted tenants, and `AuthRequired` if authentication never ran
pub async fn context_middleware(
    State(resources): State<Arc<ServerResources>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let AuthenticatedUser(user) = req
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(AppError::auth_required)?;

    // Bypass eligibility is read fresh so revocation takes effect immediately
    let super_admin = resources
        .store
        .user_holds_global_role(user.id, &resources.config.super_admin_role_name)
        .await?;

    // Super-admins skip the tenant checks and proceed with no tenant bound;
    // targeting a specific tenant is a separate capability
    let tenant_context = if super_admin {
        None
    } else {
        match user.tenant_id {
            Some(tenant_id) => Some(load_tenant_context(&resources, user.id, tenant_id).await?),
            None => return Err(AppError::no_tenant_bound(user.id)),
        }
    };

    let span = tracing::Span::current();
    span.record("user_id", tracing::field::display(user.id));
    if let Some(ref ctx) = tenant_context {
        span.record("tenant_id", tracing::field::display(ctx.tenant_id));
    }

    let context = ScopedContext::new(user, tenant_context, super_admin);
    let guard = ContextGuard::install(Arc::clone(&resources.context_bus), &context);
    req.extensions_mut().insert(context);

    let response = next.run(req).await;
    drop(guard);
    Ok(response)
}

async fn load_tenant_context(
    resources: &Arc<ServerResources>,
    user_id: Uuid,
    tenant_id: Uuid,
) -> Result<TenantContext, AppError> {
    // A binding to a tenant that no longer exists reads as no binding at all
    let tenant = resources
        .store
        .get_tenant(tenant_id)
        .await?
        .ok_or_else(|| AppError::no_tenant_bound(user_id))?;
    TenantContext::from_tenant(&tenant)
}
