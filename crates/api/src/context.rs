use gateflow_auth::Role;
use gateflow_core::{TenantId, UserId};

/// Tenant context for a request.
///
/// This is immutable and must be present for all flow routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Principal context for a request (authenticated identity + roles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    username: String,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Display name from the token, or the user id when the token has none.
    pub fn username(&self) -> String {
        if self.username.trim().is_empty() {
            self.user_id.to_string()
        } else {
            self.username.clone()
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}
