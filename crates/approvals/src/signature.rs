//! Signature records and the acting principal behind a command.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use gateflow_auth::Role;
use gateflow_core::UserId;

use crate::flow::ObjectRef;

/// The authenticated caller of a flow command, as handed over by the identity
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Actor {
    pub fn new(user_id: UserId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// A recorded sign-off at one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub user_id: UserId,
    pub username: String,
    pub signed_at: DateTime<Utc>,
    /// SHA-256 over signer, document, checkpoint, timestamp and notes.
    pub signature_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub notes: Option<String>,
    /// Set when the signer acted as a substitute for another principal.
    pub signed_for_user_id: Option<UserId>,
    pub requires_confirmation: bool,
    /// Roles the signer held at signing time; role officers match against these.
    #[serde(default)]
    pub signer_roles: Vec<Role>,
}

impl Signature {
    /// Recompute the hash from the stored fields and compare.
    pub fn verify(&self, object: &ObjectRef, checkpoint: u32) -> bool {
        signature_hash(
            self.user_id,
            object,
            checkpoint,
            self.signed_at,
            self.notes.as_deref(),
        ) == self.signature_hash
    }
}

/// Content-derived hash binding a signature to its document.
///
/// Any change to the signer, the document, the checkpoint, the timestamp or
/// the notes yields a different hash.
pub fn signature_hash(
    user_id: UserId,
    object: &ObjectRef,
    checkpoint: u32,
    signed_at: DateTime<Utc>,
    notes: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_uuid().as_bytes());
    hasher.update(b"|");
    hasher.update(object.object_type.as_bytes());
    hasher.update(b"|");
    hasher.update(object.object_id.as_bytes());
    hasher.update(b"|");
    hasher.update(checkpoint.to_be_bytes());
    hasher.update(b"|");
    hasher.update(signed_at.to_rfc3339_opts(SecondsFormat::Micros, true).as_bytes());
    hasher.update(b"|");
    hasher.update(notes.unwrap_or_default().as_bytes());

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object() -> ObjectRef {
        ObjectRef::new("purchase_order", "PO-2024-0042")
    }

    #[test]
    fn hash_is_deterministic() {
        let user = UserId::new();
        let at = Utc::now();
        let a = signature_hash(user, &object(), 1, at, Some("ok"));
        let b = signature_hash(user, &object(), 1, at, Some("ok"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_binds_notes_and_checkpoint() {
        let user = UserId::new();
        let at = Utc::now();
        let base = signature_hash(user, &object(), 1, at, None);
        assert_ne!(base, signature_hash(user, &object(), 1, at, Some("x")));
        assert_ne!(base, signature_hash(user, &object(), 2, at, None));
        assert_ne!(
            base,
            signature_hash(user, &ObjectRef::new("purchase_order", "PO-2024-0043"), 1, at, None)
        );
    }

    #[test]
    fn verify_detects_tampered_notes() {
        let user = UserId::new();
        let at = Utc::now();
        let mut sig = Signature {
            user_id: user,
            username: "ana".to_string(),
            signed_at: at,
            signature_hash: signature_hash(user, &object(), 1, at, Some("approved")),
            ip_address: None,
            user_agent: None,
            notes: Some("approved".to_string()),
            signed_for_user_id: None,
            requires_confirmation: false,
            signer_roles: vec![],
        };
        assert!(sig.verify(&object(), 1));

        sig.notes = Some("rejected".to_string());
        assert!(!sig.verify(&object(), 1));
    }
}
