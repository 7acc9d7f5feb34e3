//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod access_service;
mod hierarchy_service;
mod operation_policy;
mod security_admin_service;

#[cfg(test)]
mod test_support;

pub use access_ports::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
    CreateRoleInput, DirectoryRepository, RoleRepository,
};
pub use access_service::{AccessService, AccessSnapshot};
pub use hierarchy_service::HierarchyService;
pub use operation_policy::{OperationPolicy, operations};
pub use security_admin_service::SecurityAdminService;
