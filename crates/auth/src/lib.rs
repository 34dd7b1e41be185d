//! `gateflow-auth` — pure authentication/authorization boundary.
//!
//! Identity is consumed as an opaque fact: a verified token yields a user id,
//! a tenant and a role set. This crate is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, Principal, RolePolicy, authorize};
pub use claims::{
    Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims,
};
pub use permissions::Permission;
pub use principal::TenantMembership;
pub use roles::{HasRole, Role};
