use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gateflow_core::{TenantId, UserId};

use crate::Role;

/// JWT claims model (transport-agnostic).
///
/// The minimal set of claims the engine expects once a token has been
/// verified: who is acting, in which tenant, with which roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Display name recorded on signatures and audit entries.
    #[serde(default)]
    pub username: String,

    /// Tenant context for the token.
    pub tenant_id: TenantId,

    /// RBAC roles granted within the tenant context.
    pub roles: Vec<Role>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed or unverifiable token: {0}")]
    Malformed(String),
}

/// Deterministically validate JWT claims (time window only).
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HS256 shared-secret validator.
///
/// Signature verification is delegated to `jsonwebtoken`; the time window is
/// checked with `validate_claims` because the claims carry RFC 3339
/// timestamps rather than the registered numeric `exp`/`iat`.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            username: "ana.pop".to_string(),
            tenant_id: TenantId::new(),
            roles: vec![Role::ADMIN],
            issued_at: now,
            expires_at: now + Duration::minutes(10),
        }
    }

    fn mint(secret: &[u8], claims: &JwtClaims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_claims() {
        let now = Utc::now();
        let c = claims(now);
        let token = mint(b"secret", &c);

        let v = Hs256JwtValidator::new(b"secret".to_vec());
        assert_eq!(v.validate(&token, now).unwrap(), c);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = mint(b"secret", &claims(now));

        let v = Hs256JwtValidator::new(b"other".to_vec());
        assert!(matches!(
            v.validate(&token, now),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = mint(b"secret", &claims(now));

        let v = Hs256JwtValidator::new(b"secret".to_vec());
        assert_eq!(
            v.validate(&token, now + Duration::minutes(11)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn inverted_window_is_invalid() {
        let now = Utc::now();
        let mut c = claims(now);
        c.expires_at = now - Duration::seconds(1);
        assert_eq!(
            validate_claims(&c, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
