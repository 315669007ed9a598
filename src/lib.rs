// ABOUTME: Main library entry point for the Clubdesk tenancy engine
// ABOUTME: Tenant-scoped authorization and context propagation for multi-tenant services

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

#![deny(unsafe_code)]

//! # Clubdesk Tenancy Engine
//!
//! Tenant-scoped authorization and context propagation for multi-tenant
//! services. Every request is bound to exactly one tenant for its lifetime;
//! identity lookups, permission checks, and cache operations are all filtered
//! through that binding so no tenant can observe another's data.
//!
//! ## Architecture
//!
//! - **Tenant context**: per-request [`tenant::ScopedContext`] installed as a
//!   request extension, torn down by an RAII guard
//! - **Identity store**: pluggable [`store::Store`] (SQLite or in-memory)
//!   holding tenants, users, roles, and permissions with tenant-filtered
//!   resolution queries
//! - **Permission resolver**: [`permissions::PermissionResolver`] computing
//!   the union of direct and role-inherited permissions, cached per
//!   `(tenant, user)` with explicit invalidation
//! - **Tenant cache**: [`cache::TenantCache`] handle that namespaces every
//!   key by tenant and owns key construction
//! - **Pipeline**: [`middleware`] layers running authentication, tenant
//!   checks, context install, and authorization in a fixed order
//!
//! ## Example
//!
//! ```rust,no_run
//! use clubdesk::config::EngineConfig;
//! use clubdesk::errors::AppResult;
//! use clubdesk::resources::ServerResources;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = EngineConfig::from_env()?;
//!     clubdesk::logging::init(&config.environment)?;
//!     let resources = ServerResources::new(config).await?;
//!     println!("engine ready: {}", resources.store.backend_info());
//!     Ok(())
//! }
//! ```

/// JWT authentication and principal extraction
pub mod auth;

/// Tenant-namespaced cache layer with pluggable backends
pub mod cache;

/// Environment configuration
pub mod config;

/// Typed error handling with structured codes
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Request pipeline middleware
pub mod middleware;

/// Identity domain models
pub mod models;

/// Permission resolution and checks
pub mod permissions;

/// Shared resource container
pub mod resources;

/// Identity service coordinating mutations and invalidation
pub mod services;

/// Scoped identity store with pluggable backends
pub mod store;

/// Tenant context lifecycle
pub mod tenant;
