// ABOUTME: Request pipeline middleware for authentication, context, and authorization
// ABOUTME: Layers compose in a fixed order so context exists before any check runs

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! # Request Pipeline
//!
//! Checks run in a fixed order for every protected request:
//!
//! 1. authentication (bearer token to principal)
//! 2. tenant presence (principal must be bound to a tenant, or hold the
//!    reserved global role)
//! 3. tenant active (deactivated and soft-deleted tenants are rejected)
//! 4. context install (scoped context as a request extension, torn down by an
//!    RAII guard)
//! 5. authorization (permission expression against the resolver)
//!
//! Each failure maps to a typed error; the response status comes from the
//! error code, not from the middleware.

pub mod auth;
pub mod authz;
pub mod tenant;

pub use auth::{auth_middleware, AuthenticatedUser};
pub use authz::{authorization_middleware, AuthzRequirement};
pub use tenant::context_middleware;

use crate::resources::ServerResources;
use axum::{extract::Request, middleware::from_fn_with_state, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Wrap a router in the full pipeline with a single permission requirement
///
/// Layers apply bottom-up: tracing runs first, then authentication, tenant
/// checks and context install, authorization last.
#[must_use]
pub fn protect(
    router: Router,
    resources: &Arc<ServerResources>,
    requirement: AuthzRequirement,
) -> Router {
    router
        .layer(from_fn_with_state(
            (Arc::clone(resources), requirement),
            authorization_middleware,
        ))
        .layer(from_fn_with_state(
            Arc::clone(resources),
            context_middleware,
        ))
        .layer(from_fn_with_state(Arc::clone(resources), auth_middleware))
        .layer(
            // tenant_id/user_id start empty and are recorded once the context
            // middleware has resolved the binding
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    tenant_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
}
