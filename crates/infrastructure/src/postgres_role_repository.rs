use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crewdesk_application::{CreateRoleInput, RoleRepository};
use crewdesk_core::{AppError, AppResult, TenantId};
use crewdesk_domain::{Permission, Role, RoleId};

#[cfg(test)]
mod tests;

/// PostgreSQL-backed repository for tenant role definitions.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensures a system role exists with at least the given grants.
    pub async fn ensure_system_role(
        &self,
        tenant_id: TenantId,
        name: &str,
        permissions: &[Permission],
    ) -> AppResult<RoleId> {
        let mut transaction = begin(&self.pool).await?;

        let role_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO rbac_roles (tenant_id, name, is_system)
            VALUES ($1, $2, true)
            ON CONFLICT (tenant_id, name) DO UPDATE
            SET is_system = true
            RETURNING id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(name)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to ensure system role: {error}")))?;

        insert_grants(&mut transaction, role_id, permissions).await?;
        commit(transaction).await?;

        Ok(RoleId::from_uuid(role_id))
    }

    async fn fetch_roles(&self, tenant_id: TenantId, role_id: Option<RoleId>) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                roles.id AS role_id,
                roles.name AS role_name,
                roles.is_system,
                grants.permission
            FROM rbac_roles AS roles
            LEFT JOIN rbac_role_grants AS grants
                ON grants.role_id = roles.id
            WHERE roles.tenant_id = $1
                AND ($2::UUID IS NULL OR roles.id = $2)
            ORDER BY roles.name, grants.permission
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.map(|role_id| role_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        aggregate_roles(rows, tenant_id)
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: uuid::Uuid,
    role_name: String,
    is_system: bool,
    permission: Option<String>,
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        self.fetch_roles(tenant_id, None).await
    }

    async fn find_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .fetch_roles(tenant_id, Some(role_id))
            .await?
            .into_iter()
            .next())
    }

    async fn create_role(&self, tenant_id: TenantId, input: CreateRoleInput) -> AppResult<Role> {
        let mut transaction = begin(&self.pool).await?;

        let role_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO rbac_roles (tenant_id, name, is_system)
            VALUES ($1, $2, false)
            RETURNING id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(input.name.trim())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, input.name.as_str()))?;

        insert_grants(&mut transaction, role_id, &input.permissions).await?;
        commit(transaction).await?;

        Role::new(
            RoleId::from_uuid(role_id),
            tenant_id,
            input.name.trim(),
            false,
            input.permissions,
        )
    }

    async fn replace_role_permissions(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permissions: Vec<Permission>,
    ) -> AppResult<Role> {
        let mut transaction = begin(&self.pool).await?;

        let locked = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM rbac_roles
            WHERE tenant_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;

        sqlx::query("DELETE FROM rbac_role_grants WHERE role_id = $1")
            .bind(locked)
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to clear role grants: {error}")))?;

        insert_grants(&mut transaction, locked, &permissions).await?;
        commit(transaction).await?;

        self.find_role(tenant_id, role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        // Blocks concurrent assignments, which lock the role row FOR SHARE.
        sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM rbac_roles
            WHERE tenant_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;

        let holders = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM principals
            WHERE tenant_id = $1 AND role_kind = 'assigned' AND role_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count role holders: {error}")))?;
        if holders > 0 {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' is still assigned to {holders} principal(s)"
            )));
        }

        sqlx::query("DELETE FROM rbac_roles WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;

        commit(transaction).await
    }
}

async fn begin(pool: &PgPool) -> AppResult<Transaction<'static, Postgres>> {
    pool.begin()
        .await
        .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
}

async fn commit(transaction: Transaction<'static, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

async fn insert_grants(
    transaction: &mut Transaction<'static, Postgres>,
    role_id: uuid::Uuid,
    permissions: &[Permission],
) -> AppResult<()> {
    for permission in permissions {
        sqlx::query(
            r#"
            INSERT INTO rbac_role_grants (role_id, permission)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission) DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission.as_str())
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role grants: {error}")))?;
    }

    Ok(())
}

fn aggregate_roles(rows: Vec<RoleRow>, tenant_id: TenantId) -> AppResult<Vec<Role>> {
    let mut order = Vec::new();
    let mut by_id: HashMap<uuid::Uuid, (String, bool, Vec<Permission>)> = HashMap::new();

    for row in rows {
        let entry = by_id.entry(row.role_id).or_insert_with(|| {
            order.push(row.role_id);
            (row.role_name.clone(), row.is_system, Vec::new())
        });

        if let Some(permission_value) = row.permission {
            let permission = Permission::new(permission_value.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored permission '{permission_value}' for tenant '{tenant_id}': {error}"
                ))
            })?;

            entry.2.push(permission);
        }
    }

    order
        .into_iter()
        .filter_map(|role_id| by_id.remove(&role_id).map(|entry| (role_id, entry)))
        .map(|(role_id, (name, is_system, permissions))| {
            Role::new(
                RoleId::from_uuid(role_id),
                tenant_id,
                name,
                is_system,
                permissions,
            )
        })
        .collect()
}

fn map_role_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to create role: {error}"))
}
