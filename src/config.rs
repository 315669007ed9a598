// ABOUTME: Environment configuration management for the tenancy engine
// ABOUTME: Handles externally supplied constants like the reserved super-admin role name
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! Environment-based configuration management
//!
//! The engine consumes (but does not own) a small configuration surface:
//! the reserved super-admin role name, the cache key prefix, and the default
//! cache TTL. Everything is supplied through environment variables; there is
//! no configuration file.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::info;

/// Default reserved super-admin role name
pub const DEFAULT_SUPER_ADMIN_ROLE: &str = "super-admin";
/// Default cache key prefix (the engine namespace)
pub const DEFAULT_CACHE_PREFIX: &str = "clubdesk";
/// Default guard name for roles and permissions
pub const DEFAULT_GUARD: &str = "api";

/// Environment type, used to pick logging defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Engine configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reserved, tenant-unscoped role name that bypasses all checks
    pub super_admin_role_name: String,
    /// Prefix for every cache key the engine constructs
    pub cache_prefix: String,
    /// Default TTL for cache entries; `None` means no implicit expiry
    pub cache_default_ttl: Option<Duration>,
    /// Identity store connection string (`sqlite:...` or `memory`)
    pub database_url: String,
    /// Redis connection URL; `None` selects the in-memory cache backend
    pub redis_url: Option<String>,
    /// HS256 secret for validating bearer tokens at the authentication edge
    pub jwt_secret: String,
    /// Deployment environment
    pub environment: Environment,
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `CLUBDESK_JWT_SECRET` is missing in production, or
    /// if `CLUBDESK_CACHE_DEFAULT_TTL_SECS` is set but not a valid integer.
    pub fn from_env() -> AppResult<Self> {
        let environment = Environment::from_str_or_default(
            &env::var("CLUBDESK_ENV").unwrap_or_default(),
        );

        let jwt_secret = match env::var("CLUBDESK_JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if environment.is_production() => {
                return Err(AppError::config(
                    "CLUBDESK_JWT_SECRET must be set in production",
                ));
            }
            // Development fallback only; never used in production
            Err(_) => "clubdesk-dev-secret".to_owned(),
        };

        let cache_default_ttl = match env::var("CLUBDESK_CACHE_DEFAULT_TTL_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|e| {
                    AppError::config(format!(
                        "Invalid CLUBDESK_CACHE_DEFAULT_TTL_SECS '{raw}': {e}"
                    ))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            // Permission resolutions have no implicit expiry; invalidation is explicit
            Err(_) => None,
        };

        let config = Self {
            super_admin_role_name: env::var("CLUBDESK_SUPER_ADMIN_ROLE")
                .unwrap_or_else(|_| DEFAULT_SUPER_ADMIN_ROLE.to_owned()),
            cache_prefix: env::var("CLUBDESK_CACHE_PREFIX")
                .unwrap_or_else(|_| DEFAULT_CACHE_PREFIX.to_owned()),
            cache_default_ttl,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:clubdesk.db".to_owned()),
            redis_url: env::var("REDIS_URL").ok(),
            jwt_secret,
            environment,
        };

        info!(
            environment = %config.environment,
            cache_prefix = %config.cache_prefix,
            super_admin_role = %config.super_admin_role_name,
            "Engine configuration loaded"
        );

        Ok(config)
    }

    /// Configuration for tests: in-memory store, in-memory cache, no TTL
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            super_admin_role_name: DEFAULT_SUPER_ADMIN_ROLE.to_owned(),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_owned(),
            cache_default_ttl: None,
            database_url: "memory".to_owned(),
            redis_url: None,
            jwt_secret: "test-secret".to_owned(),
            environment: Environment::Testing,
        }
    }
}
