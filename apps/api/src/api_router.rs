use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{MethodRouter, delete, get, post, put};
use crewdesk_application::operations;
use crewdesk_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let guard = |operation: &'static str, route: MethodRouter<AppState>| {
        route.route_layer(from_fn_with_state(
            (app_state.clone(), operation),
            middleware::enforce_operation,
        ))
    };

    let scoped_routes = Router::new()
        .route(
            "/api/scopes/{resource}",
            get(handlers::access::resolve_scope_handler),
        )
        .route(
            "/api/scopes/{resource}/owners/{owner_id}",
            get(handlers::access::authorize_record_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::enforce_scoped_operation,
        ));

    let protected_routes = Router::new()
        .route(
            "/api/me/permissions",
            get(handlers::access::my_permissions_handler),
        )
        .route(
            "/api/permissions/catalog",
            guard(
                operations::PERMISSIONS_CATALOG,
                get(handlers::access::permission_catalog_handler),
            ),
        )
        .route(
            "/api/org-chart",
            guard(
                operations::ORG_CHART_READ,
                get(handlers::hierarchy::org_chart_handler),
            ),
        )
        .route(
            "/api/principals/{principal_id}/reports",
            guard(
                operations::PRINCIPALS_REPORTS,
                get(handlers::hierarchy::direct_reports_handler),
            ),
        )
        .route(
            "/api/principals/{principal_id}/chain",
            guard(
                operations::PRINCIPALS_REPORTS,
                get(handlers::hierarchy::reporting_chain_handler),
            ),
        )
        .route(
            "/api/principals/{principal_id}/manager",
            guard(
                operations::PRINCIPALS_REASSIGN_MANAGER,
                put(handlers::hierarchy::reassign_manager_handler),
            ),
        )
        .route(
            "/api/principals/{principal_id}/role",
            guard(
                operations::PRINCIPALS_ASSIGN_ROLE,
                put(handlers::security::assign_role_binding_handler),
            ),
        )
        .route(
            "/api/principals/{principal_id}/overrides",
            guard(
                operations::PRINCIPALS_SET_OVERRIDES,
                put(handlers::security::set_permission_overrides_handler),
            ),
        )
        .route(
            "/api/security/roles",
            guard(
                operations::ROLES_LIST,
                get(handlers::security::list_roles_handler),
            )
            .merge(guard(
                operations::ROLES_CREATE,
                post(handlers::security::create_role_handler),
            )),
        )
        .route(
            "/api/security/roles/{role_id}",
            guard(
                operations::ROLES_UPDATE,
                put(handlers::security::update_role_permissions_handler),
            )
            .merge(guard(
                operations::ROLES_DELETE,
                delete(handlers::security::delete_role_handler),
            )),
        )
        .route(
            "/api/security/audit-log",
            guard(
                operations::AUDIT_LIST,
                get(handlers::security::list_audit_log_handler),
            ),
        )
        .merge(scoped_routes)
        .route_layer(from_fn(middleware::require_actor));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
