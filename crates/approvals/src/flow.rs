use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gateflow_core::{Aggregate, AggregateId, AggregateRoot, TenantId, UserId};
use gateflow_events::Event;

use crate::error::ApprovalError;
use crate::evaluator::{self, CheckpointRequirements};
use crate::officer::Officer;
use crate::revert::{self, RevertTarget};
use crate::signature::{Actor, Signature, signature_hash};
use crate::template::FlowTemplate;

/// Approval flow identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(pub AggregateId);

impl FlowId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for FlowId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// The gated document. `object_id` is opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_type: String,
    pub object_id: String,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ApprovalError> {
        if self.object_type.trim().is_empty() {
            return Err(ApprovalError::InvalidDocument("object_type is empty".into()));
        }
        if self.object_id.trim().is_empty() {
            return Err(ApprovalError::InvalidDocument("object_id is empty".into()));
        }
        Ok(())
    }
}

impl core::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.object_type, self.object_id)
    }
}

/// Flow status lifecycle. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl FlowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowStatus::Pending => "pending",
            FlowStatus::InProgress => "in_progress",
            FlowStatus::Completed => "completed",
            FlowStatus::Cancelled => "cancelled",
        }
    }
}

/// One gate of a running flow, with the requirements it was created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub order: u32,
    pub title: String,
    #[serde(default)]
    pub open_for_signing: bool,
    #[serde(flatten)]
    pub requirements: CheckpointRequirements,
    #[serde(default)]
    pub signatures: Vec<Signature>,
    /// Derived; recomputed after every change.
    #[serde(default)]
    pub completed: bool,
}

impl CheckpointState {
    pub fn signature_of(&self, user_id: UserId) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.user_id == user_id)
    }

    pub fn has_signed(&self, user_id: UserId) -> bool {
        self.signature_of(user_id).is_some()
    }

    fn recompute(&mut self) {
        self.completed = evaluator::is_completed(&self.requirements, &self.signatures);
    }
}

/// Why and by whom a flow was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
    pub cancelled_by: UserId,
    pub cancelled_at: DateTime<Utc>,
}

/// A signature invalidated by a revert or an administrative removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedSignature {
    pub checkpoint: u32,
    pub user_id: UserId,
    pub username: String,
    pub signed_at: DateTime<Utc>,
    pub signature_hash: String,
}

impl RemovedSignature {
    fn from_signature(checkpoint: u32, s: &Signature) -> Self {
        Self {
            checkpoint,
            user_id: s.user_id,
            username: s.username.clone(),
            signed_at: s.signed_at,
            signature_hash: s.signature_hash.clone(),
        }
    }
}

/// Aggregate root: FlowInstance.
///
/// One per gated document. Checkpoints are kept sorted by `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowInstance {
    id: FlowId,
    tenant_id: Option<TenantId>,
    object: ObjectRef,
    config_slug: String,
    checkpoints: Vec<CheckpointState>,
    status: FlowStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancellation: Option<Cancellation>,
    version: u64,
    created: bool,
}

impl FlowInstance {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: FlowId) -> Self {
        Self {
            id,
            tenant_id: None,
            object: ObjectRef::default(),
            config_slug: String::new(),
            checkpoints: Vec::new(),
            status: FlowStatus::Pending,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            completed_at: None,
            cancellation: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> FlowId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn config_slug(&self) -> &str {
        &self.config_slug
    }

    pub fn checkpoints(&self) -> &[CheckpointState] {
        &self.checkpoints
    }

    pub fn checkpoint(&self, order: u32) -> Option<&CheckpointState> {
        self.checkpoints.iter().find(|c| c.order == order)
    }

    pub fn status(&self) -> FlowStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == FlowStatus::Cancelled
    }

    /// Lowest-ordered checkpoint that is not completed.
    pub fn active_checkpoint(&self) -> Option<&CheckpointState> {
        self.checkpoints.iter().find(|c| !c.completed)
    }

    /// The active checkpoint, or the last one once everything is completed.
    pub fn furthest_checkpoint(&self) -> Option<&CheckpointState> {
        self.active_checkpoint().or_else(|| self.checkpoints.last())
    }

    /// Whether `order` currently takes signatures.
    pub fn accepts_signatures_at(&self, order: u32) -> bool {
        match self.checkpoint(order) {
            Some(c) if c.open_for_signing => true,
            Some(c) => self.active_checkpoint().is_some_and(|a| a.order == c.order),
            None => false,
        }
    }

    /// Must-sign officers of the furthest-reached checkpoint.
    pub fn must_sign_officers(&self) -> &[Officer] {
        self.furthest_checkpoint()
            .map(|c| c.requirements.must_sign_officers.as_slice())
            .unwrap_or(&[])
    }

    /// Can-sign officers of the furthest-reached checkpoint.
    pub fn can_sign_officers(&self) -> &[Officer] {
        self.furthest_checkpoint()
            .map(|c| c.requirements.can_sign_officers.as_slice())
            .unwrap_or(&[])
    }

    pub fn min_signatures(&self) -> u32 {
        self.furthest_checkpoint()
            .map(|c| c.requirements.min_signatures)
            .unwrap_or(0)
    }

    pub fn signature_count(&self) -> usize {
        self.checkpoints.iter().map(|c| c.signatures.len()).sum()
    }

    /// Verify every stored signature hash against the gated document.
    pub fn signatures_intact(&self) -> bool {
        self.checkpoints.iter().all(|c| {
            c.signatures
                .iter()
                .all(|s| s.verify(&self.object, c.order))
        })
    }
}

impl AggregateRoot for FlowInstance {
    type Id = FlowId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateFlow.
///
/// Carries the resolved template; the registry lookup happens outside the
/// aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFlow {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub object: ObjectRef,
    pub template: FlowTemplate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SignCheckpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignCheckpoint {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub checkpoint: u32,
    pub actor: Actor,
    pub notes: Option<String>,
    pub substitute_confirmed: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RevertFlow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertFlow {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub target: RevertTarget,
    pub reason: String,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelFlow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelFlow {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub reason: String,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveSignature (administrative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveSignature {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub checkpoint: u32,
    pub user_id: UserId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowCommand {
    CreateFlow(CreateFlow),
    SignCheckpoint(SignCheckpoint),
    RevertFlow(RevertFlow),
    CancelFlow(CancelFlow),
    RemoveSignature(RemoveSignature),
}

impl FlowCommand {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            FlowCommand::CreateFlow(c) => c.tenant_id,
            FlowCommand::SignCheckpoint(c) => c.tenant_id,
            FlowCommand::RevertFlow(c) => c.tenant_id,
            FlowCommand::CancelFlow(c) => c.tenant_id,
            FlowCommand::RemoveSignature(c) => c.tenant_id,
        }
    }

    pub fn flow_id(&self) -> FlowId {
        match self {
            FlowCommand::CreateFlow(c) => c.flow_id,
            FlowCommand::SignCheckpoint(c) => c.flow_id,
            FlowCommand::RevertFlow(c) => c.flow_id,
            FlowCommand::CancelFlow(c) => c.flow_id,
            FlowCommand::RemoveSignature(c) => c.flow_id,
        }
    }

    /// Acting user; `None` for creation, which is not an audited transition.
    pub fn actor(&self) -> Option<&Actor> {
        match self {
            FlowCommand::CreateFlow(_) => None,
            FlowCommand::SignCheckpoint(c) => Some(&c.actor),
            FlowCommand::RevertFlow(c) => Some(&c.actor),
            FlowCommand::CancelFlow(c) => Some(&c.actor),
            FlowCommand::RemoveSignature(c) => Some(&c.actor),
        }
    }
}

/// Event: FlowCreated.
///
/// Carries the checkpoints denormalised from the template, so later template
/// edits never reach this flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCreated {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub object: ObjectRef,
    pub config_slug: String,
    pub checkpoints: Vec<CheckpointState>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SignatureRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecorded {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub checkpoint: u32,
    pub signature: Signature,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FlowReverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReverted {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    /// Checkpoint that was kept; everything after it was cleared.
    pub target_checkpoint: u32,
    pub reason: String,
    pub actor: UserId,
    pub actor_name: String,
    pub removed: Vec<RemovedSignature>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FlowCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCancelled {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub reason: String,
    pub actor: UserId,
    pub actor_name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SignatureRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRemoved {
    pub tenant_id: TenantId,
    pub flow_id: FlowId,
    pub removed: RemovedSignature,
    pub actor: UserId,
    pub actor_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    FlowCreated(FlowCreated),
    SignatureRecorded(SignatureRecorded),
    FlowReverted(FlowReverted),
    FlowCancelled(FlowCancelled),
    SignatureRemoved(SignatureRemoved),
}

impl Event for FlowEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FlowEvent::FlowCreated(_) => "approvals.flow.created",
            FlowEvent::SignatureRecorded(_) => "approvals.flow.signed",
            FlowEvent::FlowReverted(_) => "approvals.flow.reverted",
            FlowEvent::FlowCancelled(_) => "approvals.flow.cancelled",
            FlowEvent::SignatureRemoved(_) => "approvals.flow.signature_removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FlowEvent::FlowCreated(e) => e.occurred_at,
            FlowEvent::SignatureRecorded(e) => e.occurred_at,
            FlowEvent::FlowReverted(e) => e.occurred_at,
            FlowEvent::FlowCancelled(e) => e.occurred_at,
            FlowEvent::SignatureRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for FlowInstance {
    type Command = FlowCommand;
    type Event = FlowEvent;
    type Error = ApprovalError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            FlowEvent::FlowCreated(e) => {
                self.id = e.flow_id;
                self.tenant_id = Some(e.tenant_id);
                self.object = e.object.clone();
                self.config_slug = e.config_slug.clone();
                self.checkpoints = e.checkpoints.clone();
                self.checkpoints.sort_by_key(|c| c.order);
                self.created_at = e.occurred_at;
                self.completed_at = None;
                self.cancellation = None;
                self.created = true;
            }
            FlowEvent::SignatureRecorded(e) => {
                if let Some(cp) = self.checkpoint_mut(e.checkpoint) {
                    cp.signatures.push(e.signature.clone());
                }
            }
            FlowEvent::FlowReverted(e) => {
                for cp in self
                    .checkpoints
                    .iter_mut()
                    .filter(|c| c.order > e.target_checkpoint)
                {
                    cp.signatures.clear();
                }
            }
            FlowEvent::FlowCancelled(e) => {
                self.cancellation = Some(Cancellation {
                    reason: e.reason.clone(),
                    cancelled_by: e.actor,
                    cancelled_at: e.occurred_at,
                });
            }
            FlowEvent::SignatureRemoved(e) => {
                if let Some(cp) = self.checkpoint_mut(e.removed.checkpoint) {
                    cp.signatures.retain(|s| s.user_id != e.removed.user_id);
                }
            }
        }

        self.recompute(event.occurred_at());
        self.updated_at = event.occurred_at();

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            FlowCommand::CreateFlow(cmd) => self.handle_create(cmd),
            FlowCommand::SignCheckpoint(cmd) => self.handle_sign(cmd),
            FlowCommand::RevertFlow(cmd) => self.handle_revert(cmd),
            FlowCommand::CancelFlow(cmd) => self.handle_cancel(cmd),
            FlowCommand::RemoveSignature(cmd) => self.handle_remove_signature(cmd),
        }
    }
}

impl FlowInstance {
    fn checkpoint_mut(&mut self, order: u32) -> Option<&mut CheckpointState> {
        self.checkpoints.iter_mut().find(|c| c.order == order)
    }

    fn recompute(&mut self, at: DateTime<Utc>) {
        for cp in &mut self.checkpoints {
            cp.recompute();
        }

        let previous = self.status;
        self.status = evaluator::derive_status(&self.checkpoints, self.cancellation.is_some());

        match self.status {
            FlowStatus::Completed if previous != FlowStatus::Completed => {
                self.completed_at = Some(at);
            }
            FlowStatus::Pending | FlowStatus::InProgress => self.completed_at = None,
            _ => {}
        }
    }

    /// Shared preconditions of every mutation on an existing flow.
    fn ensure_mutable(&self, tenant_id: TenantId, flow_id: FlowId) -> Result<(), ApprovalError> {
        if !self.created || self.tenant_id != Some(tenant_id) {
            return Err(ApprovalError::FlowNotFound);
        }
        if self.id != flow_id {
            return Err(ApprovalError::FlowMismatch);
        }
        if self.is_cancelled() {
            return Err(ApprovalError::FlowCancelled);
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateFlow) -> Result<Vec<FlowEvent>, ApprovalError> {
        if self.created {
            return Err(ApprovalError::FlowAlreadyExists);
        }
        cmd.object.validate()?;
        if cmd.object.object_type != cmd.template.object_type {
            return Err(ApprovalError::InvalidDocument(format!(
                "template '{}' gates '{}' documents, not '{}'",
                cmd.template.config_slug, cmd.template.object_type, cmd.object.object_type
            )));
        }

        let checkpoints = cmd
            .template
            .ordered_checkpoints()
            .into_iter()
            .map(|cp| CheckpointState {
                order: cp.order,
                title: cp.title.clone(),
                open_for_signing: cp.open_for_signing,
                requirements: cmd.template.requirements_for(cp),
                signatures: Vec::new(),
                completed: false,
            })
            .collect();

        Ok(vec![FlowEvent::FlowCreated(FlowCreated {
            tenant_id: cmd.tenant_id,
            flow_id: cmd.flow_id,
            object: cmd.object.clone(),
            config_slug: cmd.template.config_slug.clone(),
            checkpoints,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_sign(&self, cmd: &SignCheckpoint) -> Result<Vec<FlowEvent>, ApprovalError> {
        self.ensure_mutable(cmd.tenant_id, cmd.flow_id)?;

        let cp = self
            .checkpoint(cmd.checkpoint)
            .ok_or(ApprovalError::UnknownCheckpoint(cmd.checkpoint))?;
        let actor = &cmd.actor;

        // Idempotent signing: a repeated request never adds a second entry.
        if cp.has_signed(actor.user_id) {
            return Err(ApprovalError::AlreadySigned {
                checkpoint: cp.order,
                user_id: actor.user_id,
            });
        }
        if !self.accepts_signatures_at(cp.order) {
            return Err(ApprovalError::CheckpointNotOpen(cp.order));
        }

        let matching: Vec<&Officer> = cp
            .requirements
            .officers()
            .filter(|o| o.admits(actor.user_id, &actor.roles))
            .collect();
        if matching.is_empty() {
            return Err(ApprovalError::NotAuthorized(format!(
                "{} is not an officer of checkpoint {}",
                actor.username, cp.order
            )));
        }

        let substitute = matching.iter().all(|o| o.requires_confirmation);
        let on_behalf_of = if substitute {
            matching.iter().find_map(|o| o.on_behalf_of)
        } else {
            None
        };
        if substitute && !cmd.substitute_confirmed {
            return Err(ApprovalError::ConfirmationRequired { on_behalf_of });
        }

        let notes = cmd
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let signature = Signature {
            user_id: actor.user_id,
            username: actor.username.clone(),
            signed_at: cmd.occurred_at,
            signature_hash: signature_hash(
                actor.user_id,
                &self.object,
                cp.order,
                cmd.occurred_at,
                notes.as_deref(),
            ),
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
            notes,
            signed_for_user_id: on_behalf_of,
            requires_confirmation: substitute,
            signer_roles: actor.roles.clone(),
        };

        Ok(vec![FlowEvent::SignatureRecorded(SignatureRecorded {
            tenant_id: cmd.tenant_id,
            flow_id: cmd.flow_id,
            checkpoint: cp.order,
            signature,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revert(&self, cmd: &RevertFlow) -> Result<Vec<FlowEvent>, ApprovalError> {
        self.ensure_mutable(cmd.tenant_id, cmd.flow_id)?;

        let reason = required_reason(&cmd.reason)?;
        let target = revert::resolve_target(self, cmd.target)?;

        let removed = self
            .checkpoints
            .iter()
            .filter(|c| c.order > target)
            .flat_map(|c| {
                c.signatures
                    .iter()
                    .map(move |s| RemovedSignature::from_signature(c.order, s))
            })
            .collect();

        Ok(vec![FlowEvent::FlowReverted(FlowReverted {
            tenant_id: cmd.tenant_id,
            flow_id: cmd.flow_id,
            target_checkpoint: target,
            reason,
            actor: cmd.actor.user_id,
            actor_name: cmd.actor.username.clone(),
            removed,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelFlow) -> Result<Vec<FlowEvent>, ApprovalError> {
        self.ensure_mutable(cmd.tenant_id, cmd.flow_id)?;
        let reason = required_reason(&cmd.reason)?;

        Ok(vec![FlowEvent::FlowCancelled(FlowCancelled {
            tenant_id: cmd.tenant_id,
            flow_id: cmd.flow_id,
            reason,
            actor: cmd.actor.user_id,
            actor_name: cmd.actor.username.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_signature(
        &self,
        cmd: &RemoveSignature,
    ) -> Result<Vec<FlowEvent>, ApprovalError> {
        self.ensure_mutable(cmd.tenant_id, cmd.flow_id)?;

        let cp = self
            .checkpoint(cmd.checkpoint)
            .ok_or(ApprovalError::UnknownCheckpoint(cmd.checkpoint))?;
        let sig = cp
            .signature_of(cmd.user_id)
            .ok_or(ApprovalError::SignatureNotFound {
                checkpoint: cp.order,
                user_id: cmd.user_id,
            })?;

        Ok(vec![FlowEvent::SignatureRemoved(SignatureRemoved {
            tenant_id: cmd.tenant_id,
            flow_id: cmd.flow_id,
            removed: RemovedSignature::from_signature(cp.order, sig),
            actor: cmd.actor.user_id,
            actor_name: cmd.actor.username.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn required_reason(reason: &str) -> Result<String, ApprovalError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ApprovalError::ReasonRequired);
    }
    Ok(reason.to_string())
}
