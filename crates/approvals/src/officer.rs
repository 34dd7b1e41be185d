//! Officers: the principals allowed to sign at a checkpoint.

use serde::{Deserialize, Serialize};

use gateflow_auth::{HasRole, Role};
use gateflow_core::UserId;

use crate::signature::Signature;

/// Who an officer entry refers to.
///
/// Serialized as `{"type": "user", "reference": "<uuid>"}` or
/// `{"type": "role", "reference": "economist"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "reference", rename_all = "lowercase")]
pub enum OfficerRef {
    User(UserId),
    Role(Role),
}

/// Whether an officer's signature is mandatory or counts toward the quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficerAction {
    CanSign,
    MustSign,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    pub subject: OfficerRef,
    pub display_name: String,
    pub action: OfficerAction,
    /// Signing through this entry is delegated and must be confirmed.
    #[serde(default)]
    pub requires_confirmation: bool,
    /// Principal the signer acts for when this entry is a substitute.
    #[serde(default)]
    pub on_behalf_of: Option<UserId>,
}

impl Officer {
    pub fn user(user_id: UserId, display_name: impl Into<String>, action: OfficerAction) -> Self {
        Self {
            subject: OfficerRef::User(user_id),
            display_name: display_name.into(),
            action,
            requires_confirmation: false,
            on_behalf_of: None,
        }
    }

    pub fn role(role: Role, display_name: impl Into<String>, action: OfficerAction) -> Self {
        Self {
            subject: OfficerRef::Role(role),
            display_name: display_name.into(),
            action,
            requires_confirmation: false,
            on_behalf_of: None,
        }
    }

    /// Mark this entry as a substitute signing for `principal`.
    pub fn substituting(mut self, principal: UserId) -> Self {
        self.requires_confirmation = true;
        self.on_behalf_of = Some(principal);
        self
    }

    pub fn with_action(mut self, action: OfficerAction) -> Self {
        self.action = action;
        self
    }

    /// Would `user_id`, holding `roles` right now, sign through this entry?
    pub fn admits<R>(&self, user_id: UserId, roles: &R) -> bool
    where
        R: HasRole + ?Sized,
    {
        match &self.subject {
            OfficerRef::User(u) => *u == user_id,
            OfficerRef::Role(r) => roles.has_role(r),
        }
    }

    /// Does a recorded signature satisfy this entry?
    ///
    /// Role entries are matched against the roles the signer held when signing.
    pub fn is_satisfied_by(&self, signature: &Signature) -> bool {
        self.admits(signature.user_id, signature.signer_roles.as_slice())
    }
}
