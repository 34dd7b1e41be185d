use serde::{Deserialize, Serialize};

use gateflow_core::TenantId;

use crate::{Permission, Role};

/// A principal's membership in a tenant.
///
/// States *which tenant* the principal is acting within and which
/// roles/permissions are granted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl TenantMembership {
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
