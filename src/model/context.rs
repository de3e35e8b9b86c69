use serde::{Deserialize, Serialize};
use std::fmt;

/// Organization identifier that partitions all data access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantScope(String);

impl TenantScope {
    pub fn new(org_id: impl Into<String>) -> Self {
        Self(org_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role of the caller within its organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl Role {
    /// Owners and admins may run batch operations.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Viewer => "viewer",
        };
        f.write_str(name)
    }
}

/// Identity of the caller, resolved by the request layer before a batch starts.
///
/// The orchestrator only reads the tenant and role; the user id is carried for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchContext {
    pub tenant: TenantScope,
    pub user_id: String,
    pub role: Role,
}

impl BatchContext {
    pub fn new(org_id: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            tenant: TenantScope::new(org_id),
            user_id: user_id.into(),
            role,
        }
    }
}
