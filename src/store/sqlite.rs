// ABOUTME: SQLite identity store implementation using sqlx
// ABOUTME: Schema setup, scoped uniqueness constraints, and tenant-filtered queries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use super::IdentityStore;
use crate::errors::{AppError, AppResult};
use crate::models::{Permission, Role, Tenant, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

/// SQLite-backed identity store
///
/// UUIDs and timestamps are stored as TEXT, settings documents as JSON TEXT.
/// Scoped role identity is enforced by a unique index over
/// `(name, guard, tenant_id)`; assignment tables cascade on delete.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Access the underlying pool (for maintenance tooling)
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_uuid(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| AppError::store(format!("Invalid UUID '{raw}': {e}")))
}

fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::store(format!("Invalid timestamp '{raw}': {e}")))
}

fn row_to_tenant(row: &SqliteRow) -> AppResult<Tenant> {
    let settings_raw: String = row.try_get("settings")?;
    let deleted_at: Option<String> = row.try_get("deleted_at")?;
    Ok(Tenant {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
        settings: serde_json::from_str(&settings_raw)?,
        deleted_at: deleted_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn row_to_user(row: &SqliteRow) -> AppResult<User> {
    let tenant_id: Option<String> = row.try_get("tenant_id")?;
    Ok(User {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        tenant_id: tenant_id.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        last_active: parse_timestamp(&row.try_get::<String, _>("last_active")?)?,
    })
}

fn row_to_role(row: &SqliteRow) -> AppResult<Role> {
    let tenant_id: Option<String> = row.try_get("tenant_id")?;
    Ok(Role {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        name: row.try_get("name")?,
        guard: row.try_get("guard")?,
        tenant_scoped: row.try_get::<i64, _>("tenant_scoped")? != 0,
        tenant_id: tenant_id.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn row_to_permission(row: &SqliteRow) -> AppResult<Permission> {
    Ok(Permission {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        name: row.try_get("name")?,
        guard: row.try_get("guard")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    async fn migrate(&self) -> AppResult<()> {
        // raw_sql: the schema script is multiple statements in one round trip
        sqlx::raw_sql(
            r"
            CREATE TABLE IF NOT EXISTS tenants (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL DEFAULT 1,
                settings TEXT NOT NULL DEFAULT '{}',
                deleted_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                tenant_id TEXT REFERENCES tenants(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                last_active TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS roles (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                guard TEXT NOT NULL,
                tenant_scoped INTEGER NOT NULL DEFAULT 1,
                tenant_id TEXT REFERENCES tenants(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL
            );

            -- Scoped role identity: same name may exist once per (guard, tenant)
            CREATE UNIQUE INDEX IF NOT EXISTS idx_roles_scoped_identity
                ON roles(name, guard, COALESCE(tenant_id, ''));

            CREATE TABLE IF NOT EXISTS permissions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                guard TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(name, guard)
            );

            CREATE TABLE IF NOT EXISTS user_roles (
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, role_id)
            );

            CREATE TABLE IF NOT EXISTS role_permissions (
                role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
                permission_id TEXT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
                PRIMARY KEY (role_id, permission_id)
            );

            CREATE TABLE IF NOT EXISTS user_permissions (
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                permission_id TEXT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, permission_id)
            );
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_tenant(&self, tenant: &Tenant) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO tenants (id, name, slug, is_active, settings, deleted_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(tenant.id.to_string())
        .bind(&tenant.name)
        .bind(&tenant.slug)
        .bind(i64::from(tenant.is_active))
        .bind(serde_json::to_string(&tenant.settings)?)
        .bind(tenant.deleted_at.map(|dt| dt.to_rfc3339()))
        .bind(tenant.created_at.to_rfc3339())
        .bind(tenant.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> AppResult<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE id = ?")
            .bind(tenant_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_tenant).transpose()
    }

    async fn update_tenant_settings(
        &self,
        tenant_id: Uuid,
        settings: &serde_json::Value,
    ) -> AppResult<()> {
        let result = sqlx::query("UPDATE tenants SET settings = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(settings)?)
            .bind(Utc::now().to_rfc3339())
            .bind(tenant_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Tenant {tenant_id}")));
        }
        Ok(())
    }

    async fn set_tenant_active(&self, tenant_id: Uuid, is_active: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE tenants SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(i64::from(is_active))
            .bind(Utc::now().to_rfc3339())
            .bind(tenant_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Tenant {tenant_id}")));
        }
        Ok(())
    }

    async fn soft_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE tenants SET is_active = 0, deleted_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(&now)
        .bind(tenant_id.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Tenant {tenant_id}")));
        }
        Ok(())
    }

    async fn hard_delete_tenant(&self, tenant_id: Uuid) -> AppResult<()> {
        // Foreign keys cascade to users, roles, and their assignment rows
        let result = sqlx::query("DELETE FROM tenants WHERE id = ?")
            .bind(tenant_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Tenant {tenant_id}")));
        }
        Ok(())
    }

    async fn create_user(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, display_name, tenant_id, created_at, last_active)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.tenant_id.map(|id| id.to_string()))
        .bind(user.created_at.to_rfc3339())
        .bind(user.last_active.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::already_exists(format!("User {}", user.email)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn create_role(&self, role: &Role) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO roles (id, name, guard, tenant_scoped, tenant_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(role.id.to_string())
        .bind(&role.name)
        .bind(&role.guard)
        .bind(i64::from(role.tenant_scoped))
        .bind(role.tenant_id.map(|id| id.to_string()))
        .bind(role.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                AppError::already_exists(format!("Role {}/{}", role.name, role.guard)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_role(&self, role_id: Uuid) -> AppResult<Option<Role>> {
        let row = sqlx::query("SELECT * FROM roles WHERE id = ?")
            .bind(role_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_role).transpose()
    }

    async fn find_role(
        &self,
        name: &str,
        guard: &str,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Option<Role>> {
        let row = match tenant_id {
            Some(tenant_id) => {
                sqlx::query("SELECT * FROM roles WHERE name = ? AND guard = ? AND tenant_id = ?")
                    .bind(name)
                    .bind(guard)
                    .bind(tenant_id.to_string())
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM roles WHERE name = ? AND guard = ? AND tenant_id IS NULL")
                    .bind(name)
                    .bind(guard)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        row.as_ref().map(row_to_role).transpose()
    }

    async fn create_permission(&self, permission: &Permission) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO permissions (id, name, guard, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(permission.id.to_string())
        .bind(&permission.name)
        .bind(&permission.guard)
        .bind(permission.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::already_exists(format!(
                    "Permission {}/{}",
                    permission.name, permission.guard
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_permission(&self, name: &str, guard: &str) -> AppResult<Option<Permission>> {
        let row = sqlx::query("SELECT * FROM permissions WHERE name = ? AND guard = ?")
            .bind(name)
            .bind(guard)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_permission).transpose()
    }

    async fn assign_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(role_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_role_from_user(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user_id.to_string())
            .bind(role_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn grant_permission_to_role(&self, role_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        sqlx::query("INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
            .bind(role_id.to_string())
            .bind(permission_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_permission_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = ? AND permission_id = ?")
            .bind(role_id.to_string())
            .bind(permission_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn grant_permission_to_user(&self, user_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        sqlx::query("INSERT OR IGNORE INTO user_permissions (user_id, permission_id) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(permission_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_permission_from_user(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM user_permissions WHERE user_id = ? AND permission_id = ?")
            .bind(user_id.to_string())
            .bind(permission_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn roles_for_user(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> AppResult<Vec<Role>> {
        let rows = match tenant_id {
            // Tenant boundary: roles scoped to this tenant, plus global roles
            Some(tenant_id) => {
                sqlx::query(
                    "SELECT r.* FROM roles r
                     JOIN user_roles ur ON ur.role_id = r.id
                     WHERE ur.user_id = ?
                       AND (r.tenant_id = ? OR r.tenant_scoped = 0)",
                )
                .bind(user_id.to_string())
                .bind(tenant_id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            // No tenant boundary: only global roles are visible
            None => {
                sqlx::query(
                    "SELECT r.* FROM roles r
                     JOIN user_roles ur ON ur.role_id = r.id
                     WHERE ur.user_id = ? AND r.tenant_scoped = 0",
                )
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(row_to_role).collect()
    }

    async fn permissions_for_role(&self, role_id: Uuid) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query(
            "SELECT p.* FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             WHERE rp.role_id = ?",
        )
        .bind(role_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_permission).collect()
    }

    async fn direct_permissions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query(
            "SELECT p.* FROM permissions p
             JOIN user_permissions up ON up.permission_id = p.id
             WHERE up.user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_permission).collect()
    }

    async fn users_with_role(&self, role_id: Uuid) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.* FROM users u
             JOIN user_roles ur ON ur.user_id = u.id
             WHERE ur.role_id = ?",
        )
        .bind(role_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn user_holds_global_role(&self, user_id: Uuid, role_name: &str) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = ? AND r.tenant_scoped = 0 AND r.name = ?
             LIMIT 1",
        )
        .bind(user_id.to_string())
        .bind(role_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}
