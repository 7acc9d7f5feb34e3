use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::warn;

use crewdesk_application::DirectoryRepository;
use crewdesk_core::{AppError, AppResult, PrincipalId, TenantId};
use crewdesk_domain::{
    LegacyRole, Permission, Principal, RoleBinding, RoleId, creates_manager_cycle,
};

#[cfg(test)]
mod tests;

/// PostgreSQL-backed principal directory.
#[derive(Clone)]
pub struct PostgresDirectoryRepository {
    pool: PgPool,
}

impl PostgresDirectoryRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or refreshes a principal synced from the upstream directory.
    pub async fn upsert_principal(&self, principal: &Principal) -> AppResult<()> {
        let (role_kind, legacy_role, role_id) = binding_columns(principal.role_binding());
        let mut transaction = begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO principals (
                id,
                tenant_id,
                display_name,
                job_title,
                is_active,
                manager_id,
                role_kind,
                legacy_role,
                role_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                job_title = EXCLUDED.job_title,
                is_active = EXCLUDED.is_active,
                manager_id = EXCLUDED.manager_id,
                role_kind = EXCLUDED.role_kind,
                legacy_role = EXCLUDED.legacy_role,
                role_id = EXCLUDED.role_id
            WHERE principals.tenant_id = EXCLUDED.tenant_id
            "#,
        )
        .bind(principal.id().as_uuid())
        .bind(principal.tenant_id().as_uuid())
        .bind(principal.display_name())
        .bind(principal.job_title())
        .bind(principal.is_active())
        .bind(principal.manager_id().map(|manager_id| manager_id.as_uuid()))
        .bind(role_kind)
        .bind(legacy_role)
        .bind(role_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to upsert principal: {error}")))?;

        replace_overrides(&mut transaction, principal.id(), principal.permission_overrides())
            .await?;

        commit(transaction).await
    }
}

#[derive(Debug, FromRow)]
struct ReportingLineRow {
    id: uuid::Uuid,
    display_name: String,
    is_active: bool,
    manager_id: Option<uuid::Uuid>,
}

#[derive(Debug, FromRow)]
struct PrincipalRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    display_name: String,
    job_title: Option<String>,
    is_active: bool,
    manager_id: Option<uuid::Uuid>,
    role_kind: String,
    legacy_role: Option<String>,
    role_id: Option<uuid::Uuid>,
    overrides: Vec<String>,
}

const PRINCIPAL_COLUMNS: &str = r#"
    SELECT
        principals.id,
        principals.tenant_id,
        principals.display_name,
        principals.job_title,
        principals.is_active,
        principals.manager_id,
        principals.role_kind,
        principals.legacy_role,
        principals.role_id,
        COALESCE(
            array_agg(overrides.permission ORDER BY overrides.permission)
                FILTER (WHERE overrides.permission IS NOT NULL),
            '{}'
        ) AS overrides
    FROM principals
    LEFT JOIN principal_permission_overrides AS overrides
        ON overrides.principal_id = principals.id
"#;

#[async_trait]
impl DirectoryRepository for PostgresDirectoryRepository {
    async fn list_principals(&self, tenant_id: TenantId) -> AppResult<Vec<Principal>> {
        let query = format!(
            "{PRINCIPAL_COLUMNS} WHERE principals.tenant_id = $1 GROUP BY principals.id ORDER BY principals.display_name, principals.id"
        );
        let rows = sqlx::query_as::<_, PrincipalRow>(query.as_str())
            .bind(tenant_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list principals: {error}")))?;

        rows.into_iter().map(principal_from_row).collect()
    }

    async fn find_principal(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
    ) -> AppResult<Option<Principal>> {
        let query = format!(
            "{PRINCIPAL_COLUMNS} WHERE principals.tenant_id = $1 AND principals.id = $2 GROUP BY principals.id"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(query.as_str())
            .bind(tenant_id.as_uuid())
            .bind(principal_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to find principal: {error}")))?;

        row.map(principal_from_row).transpose()
    }

    async fn update_manager(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        manager_id: Option<PrincipalId>,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        // Locks every reporting line of the tenant in id order so concurrent
        // moves re-read each other's edges before the cycle check.
        let rows = sqlx::query_as::<_, ReportingLineRow>(
            r#"
            SELECT id, display_name, is_active, manager_id
            FROM principals
            WHERE tenant_id = $1
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock reporting lines: {error}")))?;

        let principals = rows
            .into_iter()
            .map(|row| {
                Principal::new(PrincipalId::from_uuid(row.id), tenant_id, row.display_name)
                    .map(|principal| {
                        principal
                            .with_active(row.is_active)
                            .with_manager(row.manager_id.map(PrincipalId::from_uuid))
                    })
            })
            .collect::<AppResult<Vec<_>>>()?;

        if !principals
            .iter()
            .any(|principal| principal.id() == principal_id)
        {
            return Err(AppError::NotFound(format!(
                "principal '{principal_id}' does not exist"
            )));
        }
        if let Some(manager_id) = manager_id {
            let Some(manager) = principals
                .iter()
                .find(|principal| principal.id() == manager_id)
            else {
                return Err(AppError::NotFound(format!(
                    "principal '{manager_id}' does not exist"
                )));
            };
            if !manager.is_active() {
                return Err(AppError::Validation(format!(
                    "manager '{manager_id}' is deactivated"
                )));
            }
            if creates_manager_cycle(&principals, principal_id, manager_id) {
                return Err(AppError::Conflict(format!(
                    "moving '{principal_id}' under '{manager_id}' would create a reporting cycle"
                )));
            }
        }

        sqlx::query(
            r#"
            UPDATE principals
            SET manager_id = $3
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal_id.as_uuid())
        .bind(manager_id.map(|manager_id| manager_id.as_uuid()))
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update manager: {error}")))?;

        commit(transaction).await
    }

    async fn update_role_binding(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        role_binding: RoleBinding,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        // Shares the role row lock that role deletion takes exclusively.
        if let Some(role_id) = role_binding.assigned_role_id() {
            sqlx::query_scalar::<_, uuid::Uuid>(
                r#"
                SELECT id
                FROM rbac_roles
                WHERE tenant_id = $1 AND id = $2
                FOR SHARE
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(role_id.as_uuid())
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;
        }

        let (role_kind, legacy_role, role_id) = binding_columns(role_binding);
        let result = sqlx::query(
            r#"
            UPDATE principals
            SET role_kind = $3, legacy_role = $4, role_id = $5
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal_id.as_uuid())
        .bind(role_kind)
        .bind(legacy_role)
        .bind(role_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update role binding: {error}")))?;
        ensure_updated(result.rows_affected(), principal_id)?;

        commit(transaction).await
    }

    async fn update_permission_overrides(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        permissions: Vec<Permission>,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM principals
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve principal: {error}")))?;
        ensure_updated(exists as u64, principal_id)?;

        replace_overrides(&mut transaction, principal_id, &permissions).await?;

        commit(transaction).await
    }

    async fn count_principals_with_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM principals
            WHERE tenant_id = $1 AND role_kind = 'assigned' AND role_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count role holders: {error}")))?;

        Ok(u64::try_from(count).unwrap_or_default())
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

async fn replace_overrides(
    transaction: &mut Transaction<'static, Postgres>,
    principal_id: PrincipalId,
    permissions: &[Permission],
) -> AppResult<()> {
    sqlx::query("DELETE FROM principal_permission_overrides WHERE principal_id = $1")
        .bind(principal_id.as_uuid())
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear overrides: {error}")))?;

    for permission in permissions {
        sqlx::query(
            r#"
            INSERT INTO principal_permission_overrides (principal_id, permission)
            VALUES ($1, $2)
            ON CONFLICT (principal_id, permission) DO NOTHING
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(permission.as_str())
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist overrides: {error}")))?;
    }

    Ok(())
}

fn ensure_updated(rows_affected: u64, principal_id: PrincipalId) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "principal '{principal_id}' does not exist"
        )));
    }

    Ok(())
}

fn binding_columns(
    role_binding: RoleBinding,
) -> (&'static str, Option<&'static str>, Option<uuid::Uuid>) {
    match role_binding {
        RoleBinding::SuperAdmin => ("super_admin", None, None),
        RoleBinding::Legacy(legacy_role) => ("legacy", Some(legacy_role.as_str()), None),
        RoleBinding::Assigned(role_id) => ("assigned", None, Some(role_id.as_uuid())),
        RoleBinding::Unassigned => ("unassigned", None, None),
    }
}

fn binding_from_columns(
    role_kind: &str,
    legacy_role: Option<&str>,
    role_id: Option<uuid::Uuid>,
) -> AppResult<RoleBinding> {
    match (role_kind, legacy_role, role_id) {
        ("super_admin", _, _) => Ok(RoleBinding::SuperAdmin),
        ("legacy", Some(legacy_role), _) => LegacyRole::from_str(legacy_role)
            .map(RoleBinding::Legacy)
            .map_err(|error| AppError::Internal(format!("invalid stored legacy role: {error}"))),
        ("assigned", _, Some(role_id)) => Ok(RoleBinding::Assigned(RoleId::from_uuid(role_id))),
        ("unassigned", _, _) => Ok(RoleBinding::Unassigned),
        (other, _, _) => Err(AppError::Internal(format!(
            "invalid stored role binding '{other}'"
        ))),
    }
}

fn principal_from_row(row: PrincipalRow) -> AppResult<Principal> {
    let principal_id = PrincipalId::from_uuid(row.id);
    let role_binding =
        binding_from_columns(row.role_kind.as_str(), row.legacy_role.as_deref(), row.role_id)?;

    let overrides = row
        .overrides
        .into_iter()
        .filter_map(|value| match Permission::new(value.as_str()) {
            Ok(permission) => Some(permission),
            Err(error) => {
                warn!(%principal_id, value = value.as_str(), %error, "skipping malformed stored override");
                None
            }
        })
        .collect::<Vec<_>>();

    let mut principal = Principal::new(
        principal_id,
        TenantId::from_uuid(row.tenant_id),
        row.display_name,
    )?
    .with_active(row.is_active)
    .with_manager(row.manager_id.map(PrincipalId::from_uuid))
    .with_role_binding(role_binding)
    .with_permission_overrides(overrides);

    if let Some(job_title) = row.job_title {
        principal = principal.with_job_title(job_title);
    }

    Ok(principal)
}
