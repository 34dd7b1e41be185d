use axum::http::HeaderMap;

use gateflow_approvals::{Actor, FlowId};
use gateflow_auth::{CommandAuthorization, Permission};
use gateflow_core::{AggregateId, UserId};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CmdAuth<C> {
    pub fn new(inner: C, permission: Permission) -> Self {
        Self {
            inner,
            required: vec![permission],
        }
    }
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

pub fn parse_flow_id(raw: &str) -> Result<FlowId, axum::response::Response> {
    raw.parse::<AggregateId>()
        .map(FlowId::new)
        .map_err(errors::domain_error_to_response)
}

pub fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>().map_err(errors::domain_error_to_response)
}

/// The acting user, with client metadata from the request headers.
///
/// The IP is the first `x-forwarded-for` hop, as set by the fronting proxy.
pub fn actor_from(principal: &PrincipalContext, headers: &HeaderMap) -> Actor {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let ip_address = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let user_agent = header("user-agent").map(str::to_string);

    Actor::new(
        principal.user_id(),
        principal.username(),
        principal.roles().to_vec(),
    )
    .with_client(ip_address, user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use gateflow_auth::Role;

    #[test]
    fn client_metadata_comes_from_headers() {
        let principal = PrincipalContext::new(UserId::new(), "ana", vec![Role::new("cfp")]);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.7, 172.16.0.1"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8.5"));

        let actor = actor_from(&principal, &headers);
        assert_eq!(actor.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(actor.user_agent.as_deref(), Some("curl/8.5"));
        assert_eq!(actor.username, "ana");

        let bare = actor_from(&principal, &HeaderMap::new());
        assert!(bare.ip_address.is_none());
        assert!(bare.user_agent.is_none());
    }

    #[test]
    fn malformed_ids_are_bad_requests() {
        let res = parse_flow_id("not-a-uuid").unwrap_err();
        assert_eq!(res.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(parse_user_id("").is_err());
        assert!(parse_flow_id(&AggregateId::new().to_string()).is_ok());
    }
}
