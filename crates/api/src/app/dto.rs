use serde::Deserialize;
use serde_json::{Value, json};

use gateflow_approvals::{
    AuditEntry, CheckpointState, FlowInstance, FlowTemplate, Officer, Signature,
    available_shortcuts,
};
use gateflow_core::AggregateRoot;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateFlowRequest {
    pub object_type: String,
    pub object_id: String,
    pub config_slug: String,
}

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub checkpoint: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub substitute_confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub struct RevertRequest {
    pub target_checkpoint: u32,
    pub reason: String,
}

/// Body of the reason-only endpoints (cancel, revert shortcuts).
#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

// -------------------------
// Response mapping
// -------------------------

pub fn flow_to_json(flow: &FlowInstance) -> Value {
    json!({
        "id": flow.id_typed().to_string(),
        "object": flow.object(),
        "config_slug": flow.config_slug(),
        "status": flow.status(),
        "version": flow.version(),
        "created_at": flow.created_at(),
        "updated_at": flow.updated_at(),
        "completed_at": flow.completed_at(),
        "cancellation": flow.cancellation(),
        "active_checkpoint": flow.active_checkpoint().map(|c| c.order),
        "furthest_checkpoint": flow.furthest_checkpoint().map(|c| c.order),
        "must_sign_officers": flow.must_sign_officers().iter().map(officer_to_json).collect::<Vec<_>>(),
        "can_sign_officers": flow.can_sign_officers().iter().map(officer_to_json).collect::<Vec<_>>(),
        "min_signatures": flow.min_signatures(),
        "revert_shortcuts": available_shortcuts(flow),
        "checkpoints": flow.checkpoints().iter().map(checkpoint_to_json).collect::<Vec<_>>(),
    })
}

pub fn checkpoint_to_json(cp: &CheckpointState) -> Value {
    json!({
        "order": cp.order,
        "title": cp.title,
        "open_for_signing": cp.open_for_signing,
        "completed": cp.completed,
        "min_signatures": cp.requirements.min_signatures,
        "must_sign_officers": cp.requirements.must_sign_officers.iter().map(officer_to_json).collect::<Vec<_>>(),
        "can_sign_officers": cp.requirements.can_sign_officers.iter().map(officer_to_json).collect::<Vec<_>>(),
        "signatures": cp.signatures.iter().map(signature_to_json).collect::<Vec<_>>(),
    })
}

pub fn officer_to_json(officer: &Officer) -> Value {
    json!({
        "subject": officer.subject,
        "display_name": officer.display_name,
        "action": officer.action,
        "requires_confirmation": officer.requires_confirmation,
        "on_behalf_of": officer.on_behalf_of,
    })
}

/// Client metadata (IP, user agent) is kept in storage but not echoed back.
pub fn signature_to_json(sig: &Signature) -> Value {
    json!({
        "user_id": sig.user_id,
        "username": sig.username,
        "signed_at": sig.signed_at,
        "notes": sig.notes,
        "signature_hash": sig.signature_hash,
        "signed_for_user_id": sig.signed_for_user_id,
        "requires_confirmation": sig.requires_confirmation,
    })
}

pub fn template_to_json(template: &FlowTemplate) -> Value {
    json!({
        "config_slug": template.config_slug,
        "object_type": template.object_type,
        "min_signatures": template.min_signatures,
        "checkpoints": template
            .ordered_checkpoints()
            .into_iter()
            .map(|cp| {
                let req = template.requirements_for(cp);
                json!({
                    "order": cp.order,
                    "title": cp.title,
                    "open_for_signing": cp.open_for_signing,
                    "min_signatures": req.min_signatures,
                    "must_sign_officers": req.must_sign_officers.iter().map(officer_to_json).collect::<Vec<_>>(),
                    "can_sign_officers": req.can_sign_officers.iter().map(officer_to_json).collect::<Vec<_>>(),
                })
            })
            .collect::<Vec<_>>(),
    })
}

pub fn audit_entry_to_json(entry: &AuditEntry) -> Value {
    json!({
        "entry_id": entry.entry_id,
        "action": entry.action.as_str(),
        "actor": entry.actor,
        "actor_name": entry.actor_name,
        "checkpoint": entry.checkpoint,
        "reason": entry.reason,
        "timestamp": entry.timestamp,
        "resulting_status": entry.resulting_status,
        "removed_signatures": entry.removed_signatures,
    })
}
