// ABOUTME: Domain models for the scoped identity store
// ABOUTME: Defines tenants, users, tenant-scoped roles, and permissions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

//! Scoped identity models
//!
//! Every persisted record belongs to exactly one tenant, with a single
//! exception: super-admin accounts carry a null tenant. Role identity is
//! `(name, guard, tenant)`: the same role name in two tenants is two distinct
//! roles. The reserved super-admin role is the only global, unscoped role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant/Organization in the multi-tenant system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant identifier
    pub id: Uuid,
    /// Display name for the organization
    pub name: String,
    /// URL-safe identifier (e.g. "riverside-fc")
    pub slug: String,
    /// Whether tenant is active; inactive tenants fail context installation
    pub is_active: bool,
    /// Nested settings document: features, capabilities, subscription, security policy
    pub settings: serde_json::Value,
    /// Set when the tenant is soft-deleted; data retained, access revoked
    pub deleted_at: Option<DateTime<Utc>>,
    /// When tenant was created
    pub created_at: DateTime<Utc>,
    /// When tenant was last updated
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Create a new active tenant with an empty settings document
    #[must_use]
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            is_active: true,
            settings: serde_json::Value::Object(serde_json::Map::new()),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up a setting by dotted path (e.g. `"features.live_scores"`)
    #[must_use]
    pub fn setting(&self, path: &str) -> Option<&serde_json::Value> {
        path.split('.')
            .try_fold(&self.settings, |value, segment| value.get(segment))
    }
}

/// User account, bound to at most one tenant
///
/// `tenant_id` is null only for super-admin class accounts. A non-super-admin
/// user with a null tenant never passes any tenant-boundary check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// Login email, unique across all tenants
    pub email: String,
    /// Display name
    pub display_name: String,
    /// Owning tenant; null only for super-admin accounts
    pub tenant_id: Option<Uuid>,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp
    pub last_active: DateTime<Utc>,
}

impl User {
    /// Create a new user bound to a tenant
    #[must_use]
    pub fn new(email: impl Into<String>, display_name: impl Into<String>, tenant_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: display_name.into(),
            tenant_id: Some(tenant_id),
            created_at: now,
            last_active: now,
        }
    }

    /// Create an unscoped account (super-admin class, no tenant)
    #[must_use]
    pub fn new_unscoped(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: display_name.into(),
            tenant_id: None,
            created_at: now,
            last_active: now,
        }
    }
}

/// Role identified by `(name, guard, tenant)`
///
/// Two roles with identical names in different tenants are distinct entities;
/// equality must never be decided on name alone. The reserved super-admin role
/// is the only role with `tenant_id = None` and `tenant_scoped = false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// Unique role identifier
    pub id: Uuid,
    /// Role name, unique within `(guard, tenant)`
    pub name: String,
    /// Guard name (authentication scheme the role applies to)
    pub guard: String,
    /// Whether this role is scoped to a single tenant
    pub tenant_scoped: bool,
    /// Owning tenant; `None` only for the reserved super-admin role
    pub tenant_id: Option<Uuid>,
    /// When the role was created
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Create a tenant-scoped role
    #[must_use]
    pub fn scoped(name: impl Into<String>, guard: impl Into<String>, tenant_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            guard: guard.into(),
            tenant_scoped: true,
            tenant_id: Some(tenant_id),
            created_at: Utc::now(),
        }
    }

    /// Create the reserved global (unscoped) role
    #[must_use]
    pub fn global(name: impl Into<String>, guard: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            guard: guard.into(),
            tenant_scoped: false,
            tenant_id: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this role is visible within the given tenant boundary
    ///
    /// A role is visible if it is scoped to the tenant, or if it is the global
    /// (non-tenant) role. Roles of other tenants are never visible.
    #[must_use]
    pub fn visible_in_tenant(&self, tenant_id: Uuid) -> bool {
        if self.tenant_scoped {
            self.tenant_id == Some(tenant_id)
        } else {
            true
        }
    }
}

/// Permission identified by `(name, guard)`
///
/// Permissions are not tenant-owned; assignment is implicitly scoped because
/// the assigning role or user belongs to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    /// Unique permission identifier
    pub id: Uuid,
    /// Permission name, unique within guard
    pub name: String,
    /// Guard name
    pub guard: String,
    /// When the permission was created
    pub created_at: DateTime<Utc>,
}

impl Permission {
    /// Create a new permission
    #[must_use]
    pub fn new(name: impl Into<String>, guard: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            guard: guard.into(),
            created_at: Utc::now(),
        }
    }
}
