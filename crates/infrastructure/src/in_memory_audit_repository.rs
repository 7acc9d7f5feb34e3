use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use crewdesk_application::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
use crewdesk_core::{AppResult, TenantId};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredEvent {
    id: Uuid,
    event: AuditEvent,
    created_at: DateTime<Utc>,
}

/// In-memory audit trail, newest entries listed first.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<StoredEvent>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty in-memory audit trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.write().await.push(StoredEvent {
            id: Uuid::new_v4(),
            event,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditRepository {
    async fn list_recent_entries(
        &self,
        tenant_id: TenantId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let events = self.events.read().await;

        Ok(events
            .iter()
            .rev()
            .filter(|stored| stored.event.tenant_id == tenant_id)
            .filter(|stored| {
                query
                    .action
                    .as_deref()
                    .is_none_or(|action| stored.event.action.as_str() == action)
            })
            .filter(|stored| {
                query
                    .subject
                    .as_deref()
                    .is_none_or(|subject| stored.event.subject == subject)
            })
            .skip(query.offset)
            .take(query.limit.max(1))
            .map(|stored| AuditLogEntry {
                event_id: stored.id.to_string(),
                subject: stored.event.subject.clone(),
                action: stored.event.action.as_str().to_owned(),
                resource_type: stored.event.resource_type.clone(),
                resource_id: stored.event.resource_id.clone(),
                detail: stored.event.detail.clone(),
                created_at: stored.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            })
            .collect())
    }
}
