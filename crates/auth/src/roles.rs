use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC and for role-typed approval officers.
///
/// Roles are opaque strings; mapping roles to permissions is done by a
/// `RolePolicy`, and matching roles to officers by the approvals domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const APPROVALS_MANAGER: Role = Role(Cow::Borrowed("approvals_manager"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role-membership capability (`CurrentUserHasRole`).
///
/// Implemented for plain role lists so callers can pass whatever role set the
/// identity layer handed them.
pub trait HasRole {
    fn has_role(&self, role: &Role) -> bool;
}

impl HasRole for [Role] {
    fn has_role(&self, role: &Role) -> bool {
        self.iter().any(|r| r == role)
    }
}

impl HasRole for Vec<Role> {
    fn has_role(&self, role: &Role) -> bool {
        self.as_slice().has_role(role)
    }
}
