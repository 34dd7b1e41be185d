//! Audit trail entries derived from flow events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gateflow_core::{TenantId, UserId};

use crate::flow::{FlowEvent, FlowId, FlowInstance, FlowStatus, ObjectRef, RemovedSignature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Sign,
    Revert,
    Cancel,
    RemoveSignature,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Sign => "sign",
            AuditAction::Revert => "revert",
            AuditAction::Cancel => "cancel",
            AuditAction::RemoveSignature => "remove_signature",
        }
    }
}

/// One immutable line of the compliance trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub object: ObjectRef,
    pub actor: UserId,
    pub actor_name: String,
    pub action: AuditAction,
    pub checkpoint: Option<u32>,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub resulting_status: FlowStatus,
    #[serde(default)]
    pub removed_signatures: Vec<RemovedSignature>,
}

impl AuditEntry {
    /// Build the entry for `event`, given the flow state after it was applied.
    ///
    /// Creation is not a transition and yields `None`.
    pub fn from_event(event: &FlowEvent, flow: &FlowInstance) -> Option<Self> {
        let entry = |tenant_id, flow_id, actor, actor_name: &str, action, timestamp| AuditEntry {
            entry_id: Uuid::now_v7(),
            tenant_id,
            flow_id,
            object: flow.object().clone(),
            actor,
            actor_name: actor_name.to_string(),
            action,
            checkpoint: None,
            reason: None,
            timestamp,
            resulting_status: flow.status(),
            removed_signatures: Vec::new(),
        };

        match event {
            FlowEvent::FlowCreated(_) => None,
            FlowEvent::SignatureRecorded(e) => Some(AuditEntry {
                checkpoint: Some(e.checkpoint),
                ..entry(
                    e.tenant_id,
                    e.flow_id,
                    e.signature.user_id,
                    &e.signature.username,
                    AuditAction::Sign,
                    e.occurred_at,
                )
            }),
            FlowEvent::FlowReverted(e) => Some(AuditEntry {
                checkpoint: Some(e.target_checkpoint),
                reason: Some(e.reason.clone()),
                removed_signatures: e.removed.clone(),
                ..entry(
                    e.tenant_id,
                    e.flow_id,
                    e.actor,
                    &e.actor_name,
                    AuditAction::Revert,
                    e.occurred_at,
                )
            }),
            FlowEvent::FlowCancelled(e) => Some(AuditEntry {
                reason: Some(e.reason.clone()),
                ..entry(
                    e.tenant_id,
                    e.flow_id,
                    e.actor,
                    &e.actor_name,
                    AuditAction::Cancel,
                    e.occurred_at,
                )
            }),
            FlowEvent::SignatureRemoved(e) => Some(AuditEntry {
                checkpoint: Some(e.removed.checkpoint),
                removed_signatures: vec![e.removed.clone()],
                ..entry(
                    e.tenant_id,
                    e.flow_id,
                    e.actor,
                    &e.actor_name,
                    AuditAction::RemoveSignature,
                    e.occurred_at,
                )
            }),
        }
    }
}
