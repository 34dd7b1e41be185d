use std::collections::HashSet;

use thiserror::Error;

use gateflow_core::{TenantId, UserId};

use crate::{Permission, Role, TenantMembership};

/// A fully resolved principal for authorization decisions.
///
/// Built by the API (from verified claims) or by the engine (from the actor of
/// a command); construction is decoupled from storage and transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

impl Principal {
    /// Resolve a principal acting in `tenant_id` with `roles`, deriving
    /// permissions from `policy`.
    pub fn resolve(user_id: UserId, tenant_id: TenantId, roles: &[Role], policy: &RolePolicy) -> Self {
        Self {
            user_id,
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                roles: roles.to_vec(),
                permissions: policy.permissions_for(roles),
            },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Command-side authorization contract (checked at the command boundary).
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Authorize a principal within its active tenant context.
///
/// Pure policy check: no IO, no panics.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Role → permission mapping.
///
/// The default policy encodes the approval engine's conventions:
/// - `admin` grants `*` (including signature removal),
/// - `approvals_manager` may create, revert and cancel flows.
///
/// Signing and reading need no permission; officer eligibility is decided by
/// the flow itself.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    grants: Vec<(Role, Vec<Permission>)>,
}

impl RolePolicy {
    pub fn empty() -> Self {
        Self { grants: Vec::new() }
    }

    pub fn grant(mut self, role: Role, permissions: impl IntoIterator<Item = Permission>) -> Self {
        let permissions: Vec<Permission> = permissions.into_iter().collect();
        match self.grants.iter_mut().find(|(r, _)| *r == role) {
            Some((_, existing)) => existing.extend(permissions),
            None => self.grants.push((role, permissions)),
        }
        self
    }

    /// Effective permissions for a role set (deduplicated, stable order).
    pub fn permissions_for(&self, roles: &[Role]) -> Vec<Permission> {
        let mut out: Vec<Permission> = Vec::new();
        for (role, perms) in &self.grants {
            if !roles.contains(role) {
                continue;
            }
            for p in perms {
                if !out.contains(p) {
                    out.push(p.clone());
                }
            }
        }
        out
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        RolePolicy::empty()
            .grant(Role::ADMIN, [Permission::WILDCARD])
            .grant(
                Role::APPROVALS_MANAGER,
                [
                    Permission::FLOWS_CREATE,
                    Permission::FLOWS_REVERT,
                    Permission::FLOWS_CANCEL,
                ],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal_with(roles: &[Role]) -> Principal {
        Principal::resolve(UserId::new(), TenantId::new(), roles, &RolePolicy::default())
    }

    #[test]
    fn admin_is_granted_everything() {
        let p = principal_with(&[Role::ADMIN]);
        assert!(authorize(&p, &Permission::SIGNATURES_REMOVE).is_ok());
        assert!(authorize(&p, &Permission::new("anything.else")).is_ok());
    }

    #[test]
    fn manager_cannot_remove_signatures() {
        let p = principal_with(&[Role::APPROVALS_MANAGER]);
        assert!(authorize(&p, &Permission::FLOWS_CANCEL).is_ok());
        assert_eq!(
            authorize(&p, &Permission::SIGNATURES_REMOVE),
            Err(AuthzError::Forbidden("approvals.signatures.remove".to_string()))
        );
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        let p = principal_with(&[Role::new("storekeeper")]);
        assert!(p.membership.permissions.is_empty());
        assert!(authorize(&p, &Permission::FLOWS_CREATE).is_err());
    }

    #[test]
    fn tenant_mismatch_is_rejected_before_permissions() {
        let mut p = principal_with(&[Role::ADMIN]);
        p.active_tenant_id = TenantId::new();
        assert_eq!(
            authorize(&p, &Permission::FLOWS_CREATE),
            Err(AuthzError::TenantMismatch)
        );
    }

    #[test]
    fn grants_for_the_same_role_accumulate() {
        let policy = RolePolicy::empty()
            .grant(Role::new("clerk"), [Permission::FLOWS_CREATE])
            .grant(Role::new("clerk"), [Permission::FLOWS_CANCEL, Permission::FLOWS_CREATE]);
        let perms = policy.permissions_for(&[Role::new("clerk")]);
        assert_eq!(perms, vec![Permission::FLOWS_CREATE, Permission::FLOWS_CANCEL]);
    }
}
