//! API-side authorization guard for commands.
//!
//! This enforces authorization at the command boundary (before the engine
//! runs), while keeping the approval domain and infra auth-agnostic.

use gateflow_auth::{AuthzError, CommandAuthorization, Principal, RolePolicy, authorize};

use crate::context::{PrincipalContext, TenantContext};

/// Check authorization for a command in the current request context.
///
/// This is intended to be called **before** handing the command to the engine.
pub fn authorize_command<C: CommandAuthorization>(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    policy: &RolePolicy,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = Principal::resolve(
        principal.user_id(),
        tenant.tenant_id(),
        principal.roles(),
        policy,
    );

    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::routes::common::CmdAuth;
    use gateflow_auth::{Permission, Role};
    use gateflow_core::{TenantId, UserId};

    fn ctx(roles: Vec<Role>) -> (TenantContext, PrincipalContext) {
        (
            TenantContext::new(TenantId::new()),
            PrincipalContext::new(UserId::new(), "someone", roles),
        )
    }

    #[test]
    fn manager_may_cancel_but_not_remove_signatures() {
        let (tenant, principal) = ctx(vec![Role::APPROVALS_MANAGER]);
        let policy = RolePolicy::default();

        let cancel = CmdAuth::new((), Permission::FLOWS_CANCEL);
        assert!(authorize_command(&tenant, &principal, &policy, &cancel).is_ok());

        let remove = CmdAuth::new((), Permission::SIGNATURES_REMOVE);
        assert!(matches!(
            authorize_command(&tenant, &principal, &policy, &remove),
            Err(AuthzError::Forbidden(_))
        ));
    }

    #[test]
    fn plain_officers_cannot_create_flows() {
        let (tenant, principal) = ctx(vec![Role::new("economist")]);
        let create = CmdAuth::new((), Permission::FLOWS_CREATE);
        assert!(authorize_command(&tenant, &principal, &RolePolicy::default(), &create).is_err());
    }
}
