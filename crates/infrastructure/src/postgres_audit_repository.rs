use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{FromRow, PgPool};

use crewdesk_application::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
use crewdesk_core::{AppError, AppResult, TenantId};


const MAX_PAGE_SIZE: usize = 200;

/// PostgreSQL-backed audit trail: append-only writes and filtered reads.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditEntryRow {
    id: uuid::Uuid,
    subject: String,
    action: String,
    resource_type: String,
    resource_id: String,
    detail: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AuditEntryRow> for AuditLogEntry {
    fn from(row: AuditEntryRow) -> Self {
        Self {
            event_id: row.id.to_string(),
            subject: row.subject,
            action: row.action,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            detail: row.detail,
            created_at: row.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (tenant_id, subject, action, resource_type, resource_id, detail)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.tenant_id.as_uuid())
        .bind(event.subject.as_str())
        .bind(event.action.as_str())
        .bind(event.resource_type.as_str())
        .bind(event.resource_id.as_str())
        .bind(event.detail.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append audit event '{}': {error}",
                event.action.as_str()
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditRepository {
    async fn list_recent_entries(
        &self,
        tenant_id: TenantId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let limit = i64::try_from(query.limit.clamp(1, MAX_PAGE_SIZE)).unwrap_or(1);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, AuditEntryRow>(
            r#"
            SELECT id, subject, action, resource_type, resource_id, detail, created_at
            FROM audit_log_entries
            WHERE tenant_id = $1
                AND ($2::TEXT IS NULL OR action = $2)
                AND ($3::TEXT IS NULL OR subject = $3)
            ORDER BY created_at DESC, id
            LIMIT $4
            OFFSET $5
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(query.action)
        .bind(query.subject)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit entries: {error}")))?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }
}
