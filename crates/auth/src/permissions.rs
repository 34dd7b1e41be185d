use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "approvals.flows.cancel"). The
/// wildcard `"*"` grants everything within the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    pub const FLOWS_CREATE: Permission = Permission(Cow::Borrowed("approvals.flows.create"));
    pub const FLOWS_REVERT: Permission = Permission(Cow::Borrowed("approvals.flows.revert"));
    pub const FLOWS_CANCEL: Permission = Permission(Cow::Borrowed("approvals.flows.cancel"));
    pub const SIGNATURES_REMOVE: Permission =
        Permission(Cow::Borrowed("approvals.signatures.remove"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
