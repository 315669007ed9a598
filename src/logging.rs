// ABOUTME: Logging configuration and structured logging setup
// ABOUTME: Configures log levels and output format from the environment

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use crate::config::Environment;
use crate::errors::{AppError, AppResult};
use std::env;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `JSON` format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

impl LogFormat {
    /// Read from `LOG_FORMAT`, defaulting by environment
    #[must_use]
    pub fn from_env(environment: &Environment) -> Self {
        match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => Self::Json,
            Ok("compact") => Self::Compact,
            Ok("pretty") => Self::Pretty,
            _ if environment.is_production() => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// Level comes from `RUST_LOG` (default `info`), format from `LOG_FORMAT`.
/// Call once at startup; a second call fails.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(environment: &Environment) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::from_env(environment);

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };
    result.map_err(|e| AppError::config(format!("Failed to initialize logging: {e}")))
}
