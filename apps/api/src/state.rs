use crewdesk_application::{AccessService, HierarchyService, SecurityAdminService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub access_service: AccessService,
    pub security_admin_service: SecurityAdminService,
    pub hierarchy_service: HierarchyService,
}
