mod audit;
mod directory;
mod roles;

pub use audit::{AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository};
pub use directory::DirectoryRepository;
pub use roles::{CreateRoleInput, RoleRepository};
