//! Completion evaluation.
//!
//! Pure functions over officer sets and recorded signatures; nothing here
//! touches storage or the clock.
//!
//! A checkpoint is completed when
//! every must-sign officer is satisfied by some signature **and** the number of
//! signatures satisfying at least one can-sign officer reaches `min_signatures`.

use serde::{Deserialize, Serialize};

use crate::flow::{CheckpointState, FlowStatus};
use crate::officer::Officer;
use crate::signature::Signature;

/// Officer requirements of a single checkpoint, frozen at flow creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckpointRequirements {
    pub must_sign_officers: Vec<Officer>,
    pub can_sign_officers: Vec<Officer>,
    pub min_signatures: u32,
}

impl CheckpointRequirements {
    /// Every officer entry, must-sign first.
    pub fn officers(&self) -> impl Iterator<Item = &Officer> {
        self.must_sign_officers.iter().chain(self.can_sign_officers.iter())
    }
}

/// Detailed evaluation of one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub completed: bool,
    /// Must-sign officers with no matching signature yet.
    pub missing_must_sign: Vec<Officer>,
    /// Signatures that count toward the quorum.
    pub quorum_count: u32,
    pub quorum_required: u32,
}

/// Evaluate a checkpoint against its recorded signatures.
///
/// Role officers are matched against the roles snapshotted on each signature,
/// so a later role change never rewrites history.
pub fn evaluate(requirements: &CheckpointRequirements, signatures: &[Signature]) -> Completion {
    let missing_must_sign: Vec<Officer> = requirements
        .must_sign_officers
        .iter()
        .filter(|m| !signatures.iter().any(|s| m.is_satisfied_by(s)))
        .cloned()
        .collect();

    let quorum_count = signatures
        .iter()
        .filter(|s| requirements.can_sign_officers.iter().any(|c| c.is_satisfied_by(s)))
        .count() as u32;

    Completion {
        completed: missing_must_sign.is_empty() && quorum_count >= requirements.min_signatures,
        missing_must_sign,
        quorum_count,
        quorum_required: requirements.min_signatures,
    }
}

/// Whether a checkpoint's requirements are met by `signatures`.
pub fn is_completed(requirements: &CheckpointRequirements, signatures: &[Signature]) -> bool {
    evaluate(requirements, signatures).completed
}

/// Derive the overall flow status from its checkpoints.
///
/// `Cancelled` overrides everything; otherwise `Completed` when every
/// checkpoint is, `Pending` when nobody has signed anything, `InProgress` in
/// between.
pub fn derive_status(checkpoints: &[CheckpointState], cancelled: bool) -> FlowStatus {
    if cancelled {
        return FlowStatus::Cancelled;
    }
    if !checkpoints.is_empty() && checkpoints.iter().all(|c| c.completed) {
        return FlowStatus::Completed;
    }
    if checkpoints.iter().all(|c| c.signatures.is_empty()) {
        return FlowStatus::Pending;
    }
    FlowStatus::InProgress
}
