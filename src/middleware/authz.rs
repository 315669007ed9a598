// ABOUTME: Authorization middleware evaluating permission expressions per route
// ABOUTME: Runs after the scoped context is installed, denies by default

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::tenant::ScopedContext;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Permission requirement attached to a route group
///
/// The expression uses OR-pipe syntax: `"posts.edit|posts.admin"` passes when
/// the caller holds either permission. Unknown permission names deny rather
/// than error.
#[derive(Debug, Clone)]
pub struct AuthzRequirement {
    pub expression: String,
}

impl AuthzRequirement {
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

/// Authorization middleware
///
/// Attach with `middleware::from_fn_with_state((resources, requirement), ...)`
/// after the context middleware. The resolver consults the super-admin bypass
/// first, then the cached tenant-filtered permission set.
///
/// # Errors
///
/// Returns `PermissionDenied` when the expression is not satisfied and
/// `AuthRequired` if no scoped context was installed
pub async fn authorization_middleware(
    State((resources, requirement)): State<(Arc<ServerResources>, AuthzRequirement)>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let context = req
        .extensions()
        .get::<ScopedContext>()
        .cloned()
        .ok_or_else(AppError::auth_required)?;

    let allowed = resources
        .resolver
        .check(context.user.id, context.tenant_id(), &requirement.expression)
        .await?;

    if !allowed {
        debug!(
            user_id = %context.user.id,
            tenant_id = ?context.tenant_id(),
            expression = %requirement.expression,
            "Permission check denied"
        );
        return Err(AppError::permission_denied(format!(
            "Missing required permission: {}",
            requirement.expression
        )));
    }

    Ok(next.run(req).await)
}
