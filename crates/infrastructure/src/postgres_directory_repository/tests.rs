use crewdesk_application::DirectoryRepository;
use crewdesk_core::{AppError, PrincipalId, TenantId};
use crewdesk_domain::{LegacyRole, Permission, Principal, RoleBinding, RoleId};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::PostgresDirectoryRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres directory tests: {error}");
    }

    Some(pool)
}

async fn ensure_tenant(pool: &PgPool, tenant_id: TenantId, name: &str) {
    let insert = sqlx::query(
        r#"
            INSERT INTO tenants (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(name)
    .execute(pool)
    .await;

    assert!(insert.is_ok());
}

async fn insert_role(pool: &PgPool, tenant_id: TenantId, name: &str) -> RoleId {
    let inserted = sqlx::query_scalar::<_, uuid::Uuid>(
        r#"
            INSERT INTO rbac_roles (tenant_id, name)
            VALUES ($1, $2)
            RETURNING id
            "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(name)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(role_id) => RoleId::from_uuid(role_id),
        Err(error) => panic!("failed to insert test role: {error}"),
    }
}

fn principal(tenant_id: TenantId, name: &str, manager_id: Option<PrincipalId>) -> Principal {
    match Principal::new(PrincipalId::new(), tenant_id, name) {
        Ok(value) => value.with_manager(manager_id),
        Err(error) => panic!("invalid test principal: {error}"),
    }
}

fn permission(value: &str) -> Permission {
    match Permission::new(value) {
        Ok(permission) => permission,
        Err(error) => panic!("invalid test permission: {error}"),
    }
}

#[tokio::test]
async fn principals_round_trip_with_bindings_and_overrides() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresDirectoryRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    ensure_tenant(&pool, tenant_id, "Directory Tenant").await;

    let manager = principal(tenant_id, "Mia", None)
        .with_role_binding(RoleBinding::Legacy(LegacyRole::Manager))
        .with_job_title("Head of People");
    let dangling = PrincipalId::new();
    let report = principal(tenant_id, "Xavier", Some(dangling))
        .with_permission_overrides([permission("leaves.view_team")]);

    assert!(repository.upsert_principal(&manager).await.is_ok());
    assert!(repository.upsert_principal(&report).await.is_ok());

    let listed = repository.list_principals(tenant_id).await;
    assert_eq!(listed.ok(), Some(vec![manager.clone(), report.clone()]));

    assert!(
        repository
            .update_manager(tenant_id, report.id(), Some(manager.id()))
            .await
            .is_ok()
    );
    let role_id = insert_role(&pool, tenant_id, "people_partner").await;
    assert!(
        repository
            .update_role_binding(tenant_id, report.id(), RoleBinding::Assigned(role_id))
            .await
            .is_ok()
    );
    assert!(
        repository
            .update_permission_overrides(tenant_id, report.id(), Vec::new())
            .await
            .is_ok()
    );

    let reloaded = repository.find_principal(tenant_id, report.id()).await;
    let Ok(Some(reloaded)) = reloaded else {
        panic!("report should be found after updates");
    };
    assert_eq!(reloaded.manager_id(), Some(manager.id()));
    assert_eq!(reloaded.role_binding(), RoleBinding::Assigned(role_id));
    assert!(reloaded.permission_overrides().is_empty());

    let holders = repository
        .count_principals_with_role(tenant_id, role_id)
        .await;
    assert_eq!(holders.ok(), Some(1));
}

#[tokio::test]
async fn updates_are_scoped_to_the_tenant() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresDirectoryRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    let other_tenant = TenantId::new();
    ensure_tenant(&pool, tenant_id, "Home Tenant").await;
    ensure_tenant(&pool, other_tenant, "Other Tenant").await;

    let staff = principal(tenant_id, "Eli", None);
    assert!(repository.upsert_principal(&staff).await.is_ok());

    assert!(
        repository
            .update_manager(other_tenant, staff.id(), None)
            .await
            .is_err()
    );
    assert!(matches!(
        repository.find_principal(other_tenant, staff.id()).await,
        Ok(None)
    ));
}

#[tokio::test]
async fn manager_update_rejects_cycles_and_inactive_managers() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresDirectoryRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    ensure_tenant(&pool, tenant_id, "Cycle Tenant").await;

    let vp = principal(tenant_id, "Vic", None);
    let engineer = principal(tenant_id, "Eli", Some(vp.id()));
    let former = principal(tenant_id, "Gus", None).with_active(false);
    for value in [&vp, &engineer, &former] {
        assert!(repository.upsert_principal(value).await.is_ok());
    }

    assert!(matches!(
        repository
            .update_manager(tenant_id, vp.id(), Some(engineer.id()))
            .await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        repository
            .update_manager(tenant_id, engineer.id(), Some(former.id()))
            .await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        repository
            .update_manager(tenant_id, engineer.id(), Some(PrincipalId::new()))
            .await,
        Err(AppError::NotFound(_))
    ));

    let reloaded = repository.find_principal(tenant_id, vp.id()).await;
    assert!(matches!(reloaded, Ok(Some(ref value)) if value.manager_id().is_none()));
}

#[tokio::test]
async fn concurrent_opposite_moves_never_commit_a_cycle() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresDirectoryRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    ensure_tenant(&pool, tenant_id, "Concurrent Move Tenant").await;

    let first = principal(tenant_id, "Ada", None);
    let second = principal(tenant_id, "Bea", None);
    assert!(repository.upsert_principal(&first).await.is_ok());
    assert!(repository.upsert_principal(&second).await.is_ok());

    for _ in 0..10 {
        let (under_second, under_first) = tokio::join!(
            repository.update_manager(tenant_id, first.id(), Some(second.id())),
            repository.update_manager(tenant_id, second.id(), Some(first.id())),
        );

        assert!(under_second.is_ok() != under_first.is_ok());
        assert!(
            matches!(under_second, Err(AppError::Conflict(_)))
                || matches!(under_first, Err(AppError::Conflict(_)))
        );

        for value in [&first, &second] {
            assert!(
                repository
                    .update_manager(tenant_id, value.id(), None)
                    .await
                    .is_ok()
            );
        }
    }
}
