use crewdesk_application::{CreateRoleInput, DirectoryRepository, RoleRepository};
use crewdesk_core::{AppError, PrincipalId, TenantId};
use crewdesk_domain::{Permission, Principal, Role, RoleBinding};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::PostgresRoleRepository;
use crate::PostgresDirectoryRepository;

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
        panic!("failed to run migrations for postgres role tests: {error}");
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

fn permission(value: &str) -> Permission {
    match Permission::new(value) {
        Ok(permission) => permission,
        Err(error) => panic!("invalid test permission: {error}"),
    }
}

#[tokio::test]
async fn create_replace_and_delete_role() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    ensure_tenant(&pool, tenant_id, "Role Tenant").await;

    let created = repository
        .create_role(
            tenant_id,
            CreateRoleInput {
                name: "ops".to_owned(),
                permissions: vec![permission("tasks.view_team")],
            },
        )
        .await;
    let Ok(created) = created else {
        panic!("role should be created");
    };

    let duplicate = repository
        .create_role(
            tenant_id,
            CreateRoleInput {
                name: "ops".to_owned(),
                permissions: Vec::new(),
            },
        )
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let replaced = repository
        .replace_role_permissions(
            tenant_id,
            created.id(),
            vec![permission("tasks.view_all"), permission("audit.view")],
        )
        .await;
    let Ok(replaced) = replaced else {
        panic!("role grants should be replaced");
    };
    assert_eq!(replaced.permissions().len(), 2);
    assert!(!replaced.permissions().contains(&permission("tasks.view_team")));

    assert!(repository.delete_role(tenant_id, created.id()).await.is_ok());
    assert!(matches!(
        repository.delete_role(tenant_id, created.id()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn system_role_is_listed_and_flagged() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    ensure_tenant(&pool, tenant_id, "System Role Tenant").await;

    let ensured = repository
        .ensure_system_role(tenant_id, "tenant_admin", &[permission("roles.manage")])
        .await;
    assert!(ensured.is_ok());

    let roles = repository.list_roles(tenant_id).await;
    let Ok(roles) = roles else {
        panic!("roles should list");
    };
    assert_eq!(roles.len(), 1);
    assert!(roles[0].is_system());
    assert_eq!(roles[0].name(), "tenant_admin");
}

async fn create_custom_role(repository: &PostgresRoleRepository, tenant_id: TenantId) -> Role {
    let created = repository
        .create_role(
            tenant_id,
            CreateRoleInput {
                name: "contractors".to_owned(),
                permissions: vec![permission("tasks.view_own")],
            },
        )
        .await;
    match created {
        Ok(role) => role,
        Err(error) => panic!("role should be created: {error}"),
    }
}

async fn seeded_principal(directory: &PostgresDirectoryRepository, tenant_id: TenantId) -> Principal {
    let staff = match Principal::new(PrincipalId::new(), tenant_id, "Eli") {
        Ok(value) => value,
        Err(error) => panic!("invalid test principal: {error}"),
    };
    assert!(directory.upsert_principal(&staff).await.is_ok());
    staff
}

#[tokio::test]
async fn assigned_role_cannot_be_deleted() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool.clone());
    let directory = PostgresDirectoryRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    ensure_tenant(&pool, tenant_id, "Assigned Role Tenant").await;

    let role = create_custom_role(&repository, tenant_id).await;
    let staff = seeded_principal(&directory, tenant_id).await;
    assert!(
        directory
            .update_role_binding(tenant_id, staff.id(), RoleBinding::Assigned(role.id()))
            .await
            .is_ok()
    );

    assert!(matches!(
        repository.delete_role(tenant_id, role.id()).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        repository.find_role(tenant_id, role.id()).await,
        Ok(Some(_))
    ));
}

#[tokio::test]
async fn deleted_role_cannot_be_assigned() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool.clone());
    let directory = PostgresDirectoryRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    ensure_tenant(&pool, tenant_id, "Deleted Role Tenant").await;

    let role = create_custom_role(&repository, tenant_id).await;
    let staff = seeded_principal(&directory, tenant_id).await;
    assert!(repository.delete_role(tenant_id, role.id()).await.is_ok());

    assert!(matches!(
        directory
            .update_role_binding(tenant_id, staff.id(), RoleBinding::Assigned(role.id()))
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn racing_delete_and_assignment_never_leave_a_dangling_binding() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool.clone());
    let directory = PostgresDirectoryRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    ensure_tenant(&pool, tenant_id, "Racing Role Tenant").await;

    for _ in 0..10 {
        let role = create_custom_role(&repository, tenant_id).await;
        let staff = seeded_principal(&directory, tenant_id).await;

        let (deleted, assigned) = tokio::join!(
            repository.delete_role(tenant_id, role.id()),
            directory.update_role_binding(tenant_id, staff.id(), RoleBinding::Assigned(role.id())),
        );

        assert!(deleted.is_ok() != assigned.is_ok());
        let role_exists = matches!(repository.find_role(tenant_id, role.id()).await, Ok(Some(_)));
        let holders = directory
            .count_principals_with_role(tenant_id, role.id())
            .await;
        assert_eq!(holders.ok(), Some(u64::from(role_exists)));

        if role_exists {
            assert!(
                directory
                    .update_role_binding(tenant_id, staff.id(), RoleBinding::Unassigned)
                    .await
                    .is_ok()
            );
            assert!(repository.delete_role(tenant_id, role.id()).await.is_ok());
        }
    }
}
