use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crewdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Capability identifier of the form `<resource>.<action>`.
///
/// The full string is the unit of comparison. Resources may themselves be
/// dotted (`org_chart.node.view`), the action is always the last segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    /// Parses and validates a permission identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        let segments: Vec<&str> = trimmed.split('.').collect();
        if segments.len() < 2 {
            return Err(AppError::Validation(format!(
                "permission '{value}' must have the form '<resource>.<action>'"
            )));
        }

        let valid_segments = segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|character| matches!(character, 'a'..='z' | '0'..='9' | '_'))
        });
        if !valid_segments {
            return Err(AppError::Validation(format!(
                "permission '{value}' may only contain lowercase letters, digits, '_' and '.'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Builds `<resource>.<action>` from its parts.
    pub fn from_parts(resource: &str, action: &str) -> AppResult<Self> {
        Self::new(format!("{resource}.{action}"))
    }

    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the resource part (everything before the last dot).
    #[must_use]
    pub fn resource(&self) -> &str {
        self.0
            .rsplit_once('.')
            .map(|(resource, _)| resource)
            .unwrap_or(self.0.as_str())
    }

    /// Returns the action part (the last segment).
    #[must_use]
    pub fn action(&self) -> &str {
        self.0
            .rsplit_once('.')
            .map(|(_, action)| action)
            .unwrap_or(self.0.as_str())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl TryFrom<String> for Permission {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.0
    }
}

impl Display for Permission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Permissions an operation accepts. Holding any one of them suffices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequirement {
    any_of: Vec<Permission>,
}

impl PermissionRequirement {
    /// Requires exactly one permission.
    #[must_use]
    pub fn single(permission: Permission) -> Self {
        Self {
            any_of: vec![permission],
        }
    }

    /// Requires at least one of the given permissions.
    ///
    /// An empty alternative list is rejected because it could never be
    /// satisfied by anyone but a super-admin.
    pub fn any_of(permissions: impl IntoIterator<Item = Permission>) -> AppResult<Self> {
        let mut any_of: Vec<Permission> = Vec::new();
        for permission in permissions {
            if !any_of.contains(&permission) {
                any_of.push(permission);
            }
        }

        if any_of.is_empty() {
            return Err(AppError::Validation(
                "permission requirement must name at least one permission".to_owned(),
            ));
        }

        Ok(Self { any_of })
    }

    /// Parses a requirement from storage or transport values.
    pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> AppResult<Self> {
        let permissions = values
            .into_iter()
            .map(Permission::new)
            .collect::<AppResult<Vec<_>>>()?;
        Self::any_of(permissions)
    }

    /// Returns the accepted alternatives in declaration order.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        self.any_of.as_slice()
    }

    /// Returns whether `holds` accepts at least one alternative.
    pub fn is_satisfied_by(&self, mut holds: impl FnMut(&Permission) -> bool) -> bool {
        self.any_of.iter().any(|permission| holds(permission))
    }
}

impl From<Permission> for PermissionRequirement {
    fn from(value: Permission) -> Self {
        Self::single(value)
    }
}

impl Display for PermissionRequirement {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .any_of
            .iter()
            .map(Permission::as_str)
            .collect::<Vec<_>>()
            .join(" | ");
        formatter.write_str(joined.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Permission, PermissionRequirement};

    #[test]
    fn permission_splits_resource_and_action() {
        let permission = Permission::new("leaves.view_team");
        assert!(matches!(
            permission,
            Ok(ref value) if value.resource() == "leaves" && value.action() == "view_team"
        ));
    }

    #[test]
    fn permission_rejects_missing_action() {
        assert!(Permission::new("leaves").is_err());
        assert!(Permission::new("leaves.").is_err());
        assert!(Permission::new(".view").is_err());
    }

    #[test]
    fn permission_rejects_uppercase_and_spaces() {
        assert!(Permission::new("Leaves.view").is_err());
        assert!(Permission::new("leaves.view all").is_err());
    }

    #[test]
    fn empty_requirement_is_rejected() {
        assert!(PermissionRequirement::any_of(Vec::new()).is_err());
    }

    #[test]
    fn requirement_collapses_duplicates() {
        let requirement = PermissionRequirement::parse(["leaves.manage", "leaves.manage"]);
        assert!(matches!(requirement, Ok(ref value) if value.permissions().len() == 1));
    }

    #[test]
    fn requirement_is_or_not_and() {
        let Ok(requirement) = PermissionRequirement::parse(["expenses.view_all", "expenses.manage"])
        else {
            panic!("requirement should parse");
        };

        assert!(requirement.is_satisfied_by(|permission| permission.as_str() == "expenses.manage"));
        assert!(!requirement.is_satisfied_by(|permission| permission.as_str() == "expenses.view_own"));
    }
}
