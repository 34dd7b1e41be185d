//! Shared builders for the unit tests of this crate.

use chrono::Utc;
use uuid::Uuid;

use gateflow_auth::Role;
use gateflow_core::{Aggregate, AggregateId, TenantId, UserId};

use crate::error::ApprovalError;
use crate::flow::*;
use crate::officer::{Officer, OfficerAction};
use crate::revert::RevertTarget;
use crate::signature::Actor;
use crate::template::{CheckpointTemplate, FlowTemplate, TemplateRegistry};

pub fn tenant() -> TenantId {
    TenantId::from_uuid(Uuid::from_u128(1))
}

pub fn single_checkpoint(must: Vec<UserId>, can: Vec<UserId>, min: u32) -> FlowTemplate {
    let officers = must
        .into_iter()
        .map(|u| Officer::user(u, "must", OfficerAction::MustSign))
        .chain(
            can.into_iter()
                .map(|u| Officer::user(u, "can", OfficerAction::CanSign)),
        )
        .collect();

    FlowTemplate {
        config_slug: "test".to_string(),
        object_type: "purchase_order".to_string(),
        checkpoints: vec![CheckpointTemplate {
            title: "Only".to_string(),
            order: 1,
            officers,
            min_signatures: None,
            open_for_signing: false,
        }],
        min_signatures: min,
        must_sign_officers: vec![],
    }
}

/// The built-in A/B/C purchase-order template.
pub fn abc_template() -> FlowTemplate {
    TemplateRegistry::builtin()
        .get("purchase_order")
        .cloned()
        .expect("builtin purchase_order template")
}

/// `n` checkpoints, each needing one holder of the `member` role.
pub fn chain_template(n: usize) -> FlowTemplate {
    FlowTemplate {
        config_slug: "chain".to_string(),
        object_type: "purchase_order".to_string(),
        checkpoints: (1..=n as u32)
            .map(|order| CheckpointTemplate {
                title: format!("Step {order}"),
                order,
                officers: vec![Officer::role(
                    Role::new("member"),
                    "Member",
                    OfficerAction::MustSign,
                )],
                min_signatures: None,
                open_for_signing: false,
            })
            .collect(),
        min_signatures: 0,
        must_sign_officers: vec![],
    }
}

pub fn create_cmd(flow: &FlowInstance, template: FlowTemplate) -> CreateFlow {
    CreateFlow {
        tenant_id: tenant(),
        flow_id: flow.id_typed(),
        object: ObjectRef::new("purchase_order", "PO-2024-0042"),
        template,
        occurred_at: Utc::now(),
    }
}

pub fn created(template: FlowTemplate) -> FlowInstance {
    let mut flow = FlowInstance::empty(FlowId::new(AggregateId::new()));
    let cmd = create_cmd(&flow, template);
    let events = flow.handle(&FlowCommand::CreateFlow(cmd)).unwrap();
    for e in &events {
        flow.apply(e);
    }
    flow
}

pub fn actor(user_id: UserId) -> Actor {
    Actor::new(user_id, format!("user-{user_id}"), vec![])
}

pub fn role_actor(user_id: UserId, role: &'static str) -> Actor {
    Actor::new(user_id, format!("{role}-{user_id}"), vec![Role::new(role)])
}

pub fn sign_cmd(flow: &FlowInstance, checkpoint: u32, actor: &Actor, confirmed: bool) -> SignCheckpoint {
    SignCheckpoint {
        tenant_id: tenant(),
        flow_id: flow.id_typed(),
        checkpoint,
        actor: actor.clone(),
        notes: Some("ok".to_string()),
        substitute_confirmed: confirmed,
        occurred_at: Utc::now(),
    }
}

fn run(flow: &mut FlowInstance, cmd: FlowCommand) -> Result<Vec<FlowEvent>, ApprovalError> {
    let events = flow.handle(&cmd)?;
    for e in &events {
        flow.apply(e);
    }
    Ok(events)
}

pub fn sign(flow: &mut FlowInstance, checkpoint: u32, actor: &Actor) -> Result<Vec<FlowEvent>, ApprovalError> {
    let cmd = sign_cmd(flow, checkpoint, actor, false);
    run(flow, FlowCommand::SignCheckpoint(cmd))
}

pub fn sign_confirmed(
    flow: &mut FlowInstance,
    checkpoint: u32,
    actor: &Actor,
) -> Result<Vec<FlowEvent>, ApprovalError> {
    let cmd = sign_cmd(flow, checkpoint, actor, true);
    run(flow, FlowCommand::SignCheckpoint(cmd))
}

pub fn revert_to(
    flow: &mut FlowInstance,
    target: RevertTarget,
    reason: &str,
) -> Result<Vec<FlowEvent>, ApprovalError> {
    let cmd = RevertFlow {
        tenant_id: tenant(),
        flow_id: flow.id_typed(),
        target,
        reason: reason.to_string(),
        actor: Actor::new(UserId::new(), "manager", vec![Role::APPROVALS_MANAGER]),
        occurred_at: Utc::now(),
    };
    run(flow, FlowCommand::RevertFlow(cmd))
}

pub fn cancel(flow: &mut FlowInstance, reason: &str) -> Result<Vec<FlowEvent>, ApprovalError> {
    let cmd = CancelFlow {
        tenant_id: tenant(),
        flow_id: flow.id_typed(),
        reason: reason.to_string(),
        actor: Actor::new(UserId::new(), "manager", vec![Role::APPROVALS_MANAGER]),
        occurred_at: Utc::now(),
    };
    run(flow, FlowCommand::CancelFlow(cmd))
}

pub fn remove(
    flow: &mut FlowInstance,
    checkpoint: u32,
    user_id: UserId,
) -> Result<Vec<FlowEvent>, ApprovalError> {
    let cmd = RemoveSignature {
        tenant_id: tenant(),
        flow_id: flow.id_typed(),
        checkpoint,
        user_id,
        actor: Actor::new(UserId::new(), "admin", vec![Role::ADMIN]),
        occurred_at: Utc::now(),
    };
    run(flow, FlowCommand::RemoveSignature(cmd))
}
