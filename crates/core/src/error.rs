//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error category shared by every layer.
///
/// The API maps categories to transport status codes and decides what is
/// retryable; more specific error enums expose their category via `kind()`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// User-correctable input problem (missing reason, missing confirmation).
    Validation,
    /// The caller is not allowed to perform the operation.
    Authorization,
    /// Concurrent write collision; retry by re-fetching.
    Conflict,
    /// The flow or document does not exist.
    NotFound,
    /// The operation targets a record in a terminal state.
    TerminalState,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Conflict)
    }
}

/// Domain-level error.
///
/// Raised by the shared primitives in this crate. Approval decisions have their
/// own richer error enum in `gateflow-approvals`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidId(_) => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(ErrorKind::Conflict.is_retryable());
        assert!(!ErrorKind::TerminalState.is_retryable());
        assert!(!DomainError::invalid_id("x").kind().is_retryable());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::TerminalState).unwrap();
        assert_eq!(json, "\"terminal_state\"");
    }
}
