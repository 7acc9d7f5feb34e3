use std::sync::Arc;

use crewdesk_application::{
    AccessService, AuditLogRepository, AuditRepository, DirectoryRepository, HierarchyService,
    OperationPolicy, RoleRepository, SecurityAdminService,
};
use crewdesk_core::{AppError, AppResult};
use crewdesk_domain::PermissionCatalog;
use crewdesk_infrastructure::{
    InMemoryAuditRepository, InMemoryDirectoryRepository, InMemoryRoleRepository,
    PostgresAuditRepository, PostgresDirectoryRepository, PostgresRoleRepository,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, DirectoryBackend};
use crate::dev_seed;
use crate::state::AppState;

pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

pub async fn build_app_state(config: &ApiConfig) -> AppResult<AppState> {
    match &config.backend {
        DirectoryBackend::Memory => build_in_memory_state(config.dev_seed).await,
        DirectoryBackend::Postgres { database_url } => {
            if config.dev_seed {
                warn!("DEV_SEED only applies to the in-memory backend, skipping");
            }

            let pool = connect_and_migrate(database_url).await?;
            info!("using postgres directory backend");

            let audit = Arc::new(PostgresAuditRepository::new(pool.clone()));
            assemble(
                Arc::new(PostgresDirectoryRepository::new(pool.clone())),
                Arc::new(PostgresRoleRepository::new(pool)),
                audit.clone(),
                audit,
            )
        }
    }
}

pub async fn build_in_memory_state(dev_seed: bool) -> AppResult<AppState> {
    let directory = Arc::new(InMemoryDirectoryRepository::new());
    let roles = Arc::new(InMemoryRoleRepository::new());
    let audit = Arc::new(InMemoryAuditRepository::new());

    if dev_seed {
        dev_seed::run(&directory, &roles).await?;
    }
    info!(dev_seed, "using in-memory directory backend");

    assemble(directory, roles, audit.clone(), audit)
}

fn assemble(
    directory_repository: Arc<dyn DirectoryRepository>,
    role_repository: Arc<dyn RoleRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    audit_log_repository: Arc<dyn AuditLogRepository>,
) -> AppResult<AppState> {
    let access_service = AccessService::new(
        Arc::new(PermissionCatalog::builtin()),
        Arc::new(OperationPolicy::builtin()?),
        directory_repository.clone(),
        role_repository.clone(),
        audit_repository.clone(),
    )?;

    Ok(AppState {
        security_admin_service: SecurityAdminService::new(
            access_service.clone(),
            directory_repository.clone(),
            role_repository,
            audit_log_repository,
            audit_repository.clone(),
        ),
        hierarchy_service: HierarchyService::new(
            access_service.clone(),
            directory_repository,
            audit_repository,
        ),
        access_service,
    })
}
