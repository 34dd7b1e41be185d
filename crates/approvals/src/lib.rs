//! Approval flow domain module (multi-checkpoint sign-off).
//!
//! This crate contains the business rules for approval flows, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage): officer
//! eligibility, quorum-based completion, reverts and cancellation.

pub mod audit;
pub mod error;
pub mod evaluator;
pub mod flow;
pub mod officer;
pub mod revert;
pub mod signature;
pub mod template;

#[cfg(test)]
mod fixtures;

pub use audit::{AuditAction, AuditEntry};
pub use error::ApprovalError;
pub use evaluator::{CheckpointRequirements, Completion, derive_status, evaluate, is_completed};
pub use flow::{
    CancelFlow, Cancellation, CheckpointState, CreateFlow, FlowCancelled, FlowCommand,
    FlowCreated, FlowEvent, FlowId, FlowInstance, FlowReverted, FlowStatus, ObjectRef,
    RemoveSignature, RemovedSignature, RevertFlow, SignCheckpoint, SignatureRecorded,
    SignatureRemoved,
};
pub use officer::{Officer, OfficerAction, OfficerRef};
pub use revert::{RevertShortcut, RevertTarget, available_shortcuts};
pub use signature::{Actor, Signature, signature_hash};
pub use template::{CheckpointTemplate, FlowTemplate, TemplateError, TemplateRegistry};
