// ABOUTME: Authentication middleware validating bearer tokens into a principal
// ABOUTME: Loads the user record and injects it into request extensions

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use crate::auth::extract_bearer_token;
use crate::errors::AppError;
use crate::models::User;
use crate::resources::ServerResources;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Authenticated user wrapper inserted into request extensions
///
/// Present only after `auth_middleware` has accepted the request; the context
/// middleware consumes it to build the scoped context.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Authentication middleware
///
/// Extracts the bearer token, validates it, loads the user record, and
/// injects [`AuthenticatedUser`]. Requests without a valid token are rejected
/// before any tenant or permission logic runs.
///
/// # Errors
///
/// Returns `AuthRequired` when no token is present and `AuthInvalid` when the
/// token fails validation or names no known user
pub async fn auth_middleware(
    State(resources): State<Arc<ServerResources>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(AppError::auth_required)?;

    let principal = resources.auth.validate_token(token)?;

    let user = resources
        .store
        .get_user(principal.user_id)
        .await?
        .ok_or_else(|| AppError::auth_invalid("Token subject is not a known user"))?;

    debug!(user_id = %user.id, "Request authenticated");
    req.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(req).await)
}
