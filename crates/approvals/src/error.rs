//! Approval-specific failures.

use thiserror::Error;

use gateflow_core::{ErrorKind, UserId};

/// Why a flow operation was rejected.
///
/// Every rejection happens before any state change, so a rejected command
/// never leaves a partially updated flow behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("approval flow not found")]
    FlowNotFound,

    #[error("approval flow already exists for this document")]
    FlowAlreadyExists,

    #[error("approval flow is cancelled")]
    FlowCancelled,

    #[error("not an eligible officer: {0}")]
    NotAuthorized(String),

    #[error("user {user_id} already signed checkpoint {checkpoint}")]
    AlreadySigned { checkpoint: u32, user_id: UserId },

    #[error("substitute signing must be confirmed explicitly")]
    ConfirmationRequired { on_behalf_of: Option<UserId> },

    #[error("a non-empty reason is required")]
    ReasonRequired,

    #[error("checkpoint {0} does not exist in this flow")]
    UnknownCheckpoint(u32),

    #[error("checkpoint {0} is not open for signing")]
    CheckpointNotOpen(u32),

    #[error("invalid revert target: {0}")]
    InvalidRevertTarget(String),

    #[error("no signature by {user_id} at checkpoint {checkpoint}")]
    SignatureNotFound { checkpoint: u32, user_id: UserId },

    #[error("invalid document reference: {0}")]
    InvalidDocument(String),

    #[error("command does not target this flow")]
    FlowMismatch,

    #[error("no approval template named '{0}'")]
    UnknownTemplate(String),
}

impl ApprovalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApprovalError::FlowNotFound | ApprovalError::SignatureNotFound { .. } => {
                ErrorKind::NotFound
            }
            ApprovalError::FlowAlreadyExists => ErrorKind::Conflict,
            ApprovalError::FlowCancelled => ErrorKind::TerminalState,
            ApprovalError::NotAuthorized(_) | ApprovalError::FlowMismatch => {
                ErrorKind::Authorization
            }
            ApprovalError::AlreadySigned { .. }
            | ApprovalError::ConfirmationRequired { .. }
            | ApprovalError::ReasonRequired
            | ApprovalError::UnknownCheckpoint(_)
            | ApprovalError::CheckpointNotOpen(_)
            | ApprovalError::InvalidRevertTarget(_)
            | ApprovalError::InvalidDocument(_)
            | ApprovalError::UnknownTemplate(_) => ErrorKind::Validation,
        }
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ApprovalError::FlowNotFound => "flow_not_found",
            ApprovalError::FlowAlreadyExists => "flow_already_exists",
            ApprovalError::FlowCancelled => "flow_cancelled",
            ApprovalError::NotAuthorized(_) => "not_authorized",
            ApprovalError::AlreadySigned { .. } => "already_signed",
            ApprovalError::ConfirmationRequired { .. } => "confirmation_required",
            ApprovalError::ReasonRequired => "reason_required",
            ApprovalError::UnknownCheckpoint(_) => "unknown_checkpoint",
            ApprovalError::CheckpointNotOpen(_) => "checkpoint_not_open",
            ApprovalError::InvalidRevertTarget(_) => "invalid_revert_target",
            ApprovalError::SignatureNotFound { .. } => "signature_not_found",
            ApprovalError::InvalidDocument(_) => "invalid_document",
            ApprovalError::FlowMismatch => "flow_mismatch",
            ApprovalError::UnknownTemplate(_) => "unknown_template",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_flows_are_terminal() {
        assert_eq!(ApprovalError::FlowCancelled.kind(), ErrorKind::TerminalState);
    }

    #[test]
    fn confirmation_is_a_validation_problem() {
        let err = ApprovalError::ConfirmationRequired { on_behalf_of: None };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), "confirmation_required");
    }
}
