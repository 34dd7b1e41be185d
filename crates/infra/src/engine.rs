//! Flow command execution (application-level orchestration).
//!
//! Every mutation runs the same pipeline:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the flow and its version (tenant-scoped)
//!   ↓
//! 2. Handle the command (pure decision logic, produces events)
//!   ↓
//! 3. Apply the events and write back, conditioned on the loaded version
//!   ↓      (on a version mismatch: back off and start again at 1)
//! 4. Append audit entries (retried, never rolls back the write)
//!   ↓
//! 5. Publish status transitions to the bus
//! ```
//!
//! Steps 1 and 2, and the waits between attempts, run under the request
//! deadline. The write in step 3 is never cancelled once sent, and a write that
//! landed always goes through steps 4 and 5, so a timeout never skips the trail
//! of a successful change.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use gateflow_approvals::{
    Actor, ApprovalError, AuditEntry, CancelFlow, CreateFlow, FlowCommand, FlowEvent, FlowId,
    FlowInstance, FlowStatus, ObjectRef, RemoveSignature, RevertFlow, RevertTarget,
    SignCheckpoint, TemplateRegistry,
};
use gateflow_auth::{Permission, Principal, RolePolicy, authorize};
use gateflow_core::{Aggregate, AggregateId, AggregateRoot, ErrorKind, ExpectedVersion, TenantId, UserId};
use gateflow_events::{Event, EventBus, EventEnvelope};

use crate::audit_log::{AuditLog, AuditLogError};
use crate::flow_store::{FlowStore, FlowStoreError};

/// Aggregate type stamped on published envelopes.
pub const FLOW_AGGREGATE_TYPE: &str = "approvals.flow";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Attempts per command before a version conflict is surfaced.
    pub max_attempts: u32,
    /// Deadline for loading, deciding and retry waits of one command.
    pub request_timeout: Duration,
    pub audit_max_attempts: u32,
    /// Base delay between attempts; grows linearly with the attempt number.
    pub retry_backoff: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            request_timeout: Duration::from_millis(5000),
            audit_max_attempts: 3,
            retry_backoff: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The flow refused the command; nothing was written.
    #[error(transparent)]
    Rejected(#[from] ApprovalError),

    /// Version conflicts persisted through every attempt.
    #[error("conflicting concurrent updates after {attempts} attempts: {message}")]
    Conflict { attempts: u32, message: String },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("flow store failure: {0}")]
    Store(FlowStoreError),

    #[error("audit log failure: {0}")]
    Audit(AuditLogError),

    /// Publication failed after a successful write (at-least-once; a retry may duplicate).
    #[error("publication failed: {0}")]
    Publish(String),
}

impl EngineError {
    /// Taxonomy class, or `None` for infrastructure failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EngineError::Rejected(e) => Some(e.kind()),
            EngineError::Conflict { .. } => Some(ErrorKind::Conflict),
            EngineError::Store(FlowStoreError::TenantIsolation(_)) => Some(ErrorKind::NotFound),
            _ => None,
        }
    }
}

/// Payload published on the bus after every successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTransition {
    pub flow_id: FlowId,
    pub object: ObjectRef,
    pub event_type: String,
    /// `None` when the flow was just created.
    pub previous_status: Option<FlowStatus>,
    pub status: FlowStatus,
}

pub type TransitionEnvelope = EventEnvelope<FlowTransition>;

/// Signing input beyond the acting user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    pub checkpoint: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub substitute_confirmed: bool,
}

/// Result of an idempotent create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedFlow {
    pub flow: FlowInstance,
    /// `false` when the document already had a flow and it was returned as is.
    pub created: bool,
}

/// A decided change: the flow after its events, and the status it left.
struct Change {
    flow: FlowInstance,
    previous: Option<FlowStatus>,
    events: Vec<FlowEvent>,
}

/// Runs flow commands against a store, an audit log and a bus.
///
/// Generic over the backends so tests use the in-memory ones and production
/// the Postgres ones without touching the orchestration.
pub struct FlowEngine<S, A, B> {
    store: S,
    audit: A,
    bus: B,
    templates: Arc<TemplateRegistry>,
    policy: RolePolicy,
    settings: EngineSettings,
}

impl<S, A, B> FlowEngine<S, A, B> {
    pub fn new(
        store: S,
        audit: A,
        bus: B,
        templates: Arc<TemplateRegistry>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            audit,
            bus,
            templates,
            policy: RolePolicy::default(),
            settings,
        }
    }

    pub fn with_policy(mut self, policy: RolePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, A, B> FlowEngine<S, A, B>
where
    S: FlowStore,
    A: AuditLog,
    B: EventBus<TransitionEnvelope>,
{
    #[instrument(skip(self), fields(tenant_id = %tenant_id, flow_id = %flow_id))]
    pub async fn get_flow(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<FlowInstance, EngineError> {
        self.bounded(self.load_existing(tenant_id, flow_id)).await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, object = %object))]
    pub async fn find_by_object(
        &self,
        tenant_id: TenantId,
        object: &ObjectRef,
    ) -> Result<Option<FlowInstance>, EngineError> {
        self.bounded(async {
            let found = self
                .store
                .find_by_object(tenant_id, object)
                .await
                .map_err(EngineError::Store)?;
            match found {
                Some(flow) => Ok(Some(ensure_tenant(tenant_id, flow)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Instantiate `config_slug` for a document, or return the flow it already has.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, object = %object))]
    pub async fn create_flow(
        &self,
        tenant_id: TenantId,
        object: ObjectRef,
        config_slug: &str,
    ) -> Result<CreatedFlow, EngineError> {
        object.validate()?;
        let template = self
            .templates
            .get(config_slug)
            .cloned()
            .ok_or_else(|| ApprovalError::UnknownTemplate(config_slug.to_string()))?;

        let deadline = Instant::now() + self.settings.request_timeout;
        let mut attempt = 0;
        let change = loop {
            attempt += 1;

            let existing = self
                .before(deadline, async {
                    let found = self
                        .store
                        .find_by_object(tenant_id, &object)
                        .await
                        .map_err(EngineError::Store)?;
                    found.map(|flow| ensure_tenant(tenant_id, flow)).transpose()
                })
                .await?;
            if let Some(flow) = existing {
                return Ok(CreatedFlow {
                    flow,
                    created: false,
                });
            }

            let mut flow = FlowInstance::empty(FlowId::new(AggregateId::new()));
            let command = FlowCommand::CreateFlow(CreateFlow {
                tenant_id,
                flow_id: flow.id_typed(),
                object: object.clone(),
                template: template.clone(),
                occurred_at: Utc::now(),
            });
            let events = flow.handle(&command)?;
            for event in &events {
                flow.apply(event);
            }
            let change = Change {
                flow,
                previous: None,
                events,
            };

            match self.store.save(&change.flow, ExpectedVersion::NoRecord).await {
                Ok(()) => break change,
                Err(FlowStoreError::Conflict(message)) => {
                    self.back_off(deadline, attempt, message).await?
                }
                Err(err) => return Err(EngineError::Store(err)),
            }
        };

        let flow = self.finish(change).await?;
        info!(flow_id = %flow.id_typed(), config_slug, "approval flow created");
        Ok(CreatedFlow {
            flow,
            created: true,
        })
    }

    #[instrument(
        skip(self, request, actor),
        fields(tenant_id = %tenant_id, flow_id = %flow_id, checkpoint = request.checkpoint, user_id = %actor.user_id)
    )]
    pub async fn sign(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
        request: SignRequest,
        actor: Actor,
    ) -> Result<FlowInstance, EngineError> {
        self.execute(tenant_id, flow_id, |occurred_at| {
            FlowCommand::SignCheckpoint(SignCheckpoint {
                tenant_id,
                flow_id,
                checkpoint: request.checkpoint,
                actor: actor.clone(),
                notes: request.notes.clone(),
                substitute_confirmed: request.substitute_confirmed,
                occurred_at,
            })
        })
        .await
    }

    #[instrument(
        skip(self, reason, actor),
        fields(tenant_id = %tenant_id, flow_id = %flow_id, target = ?target, user_id = %actor.user_id)
    )]
    pub async fn revert(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
        target: RevertTarget,
        reason: String,
        actor: Actor,
    ) -> Result<FlowInstance, EngineError> {
        self.execute(tenant_id, flow_id, |occurred_at| {
            FlowCommand::RevertFlow(RevertFlow {
                tenant_id,
                flow_id,
                target,
                reason: reason.clone(),
                actor: actor.clone(),
                occurred_at,
            })
        })
        .await
    }

    #[instrument(
        skip(self, reason, actor),
        fields(tenant_id = %tenant_id, flow_id = %flow_id, user_id = %actor.user_id)
    )]
    pub async fn cancel(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
        reason: String,
        actor: Actor,
    ) -> Result<FlowInstance, EngineError> {
        self.execute(tenant_id, flow_id, |occurred_at| {
            FlowCommand::CancelFlow(CancelFlow {
                tenant_id,
                flow_id,
                reason: reason.clone(),
                actor: actor.clone(),
                occurred_at,
            })
        })
        .await
    }

    /// Administrative removal; the actor needs `approvals.signatures.remove`.
    #[instrument(
        skip(self, actor),
        fields(tenant_id = %tenant_id, flow_id = %flow_id, signer = %user_id, user_id = %actor.user_id)
    )]
    pub async fn remove_signature(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
        checkpoint: u32,
        user_id: UserId,
        actor: Actor,
    ) -> Result<FlowInstance, EngineError> {
        let principal = Principal::resolve(actor.user_id, tenant_id, &actor.roles, &self.policy);
        if let Err(denied) = authorize(&principal, &Permission::SIGNATURES_REMOVE) {
            warn!(reason = %denied, "signature removal denied");
            return Err(ApprovalError::NotAuthorized(denied.to_string()).into());
        }

        self.execute(tenant_id, flow_id, |occurred_at| {
            FlowCommand::RemoveSignature(RemoveSignature {
                tenant_id,
                flow_id,
                checkpoint,
                user_id,
                actor: actor.clone(),
                occurred_at,
            })
        })
        .await
    }

    /// Audit trail of a flow, oldest first.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, flow_id = %flow_id))]
    pub async fn audit_trail(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<Vec<AuditEntry>, EngineError> {
        self.bounded(async {
            self.load_existing(tenant_id, flow_id).await?;
            self.audit
                .list_for_flow(tenant_id, flow_id)
                .await
                .map_err(EngineError::Audit)
        })
        .await
    }

    /// Optimistic read-modify-write with bounded retries.
    ///
    /// `build` is called once per attempt with the attempt's timestamp. Loading,
    /// deciding and waiting between attempts count against the request
    /// deadline; a write that has been sent is always awaited, so a landed
    /// change is never left without its audit entries.
    async fn execute<F>(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
        build: F,
    ) -> Result<FlowInstance, EngineError>
    where
        F: Fn(DateTime<Utc>) -> FlowCommand + Send + Sync,
    {
        let deadline = Instant::now() + self.settings.request_timeout;
        let mut attempt = 0;
        let change = loop {
            attempt += 1;

            let mut flow = self
                .before(deadline, self.load_existing(tenant_id, flow_id))
                .await?;
            let previous = flow.status();
            let expected = ExpectedVersion::Exact(flow.version());

            let command = build(Utc::now());
            let events = flow.handle(&command).map_err(|err| {
                warn!(code = err.code(), error = %err, "flow command rejected");
                EngineError::Rejected(err)
            })?;
            for event in &events {
                flow.apply(event);
            }
            let change = Change {
                flow,
                previous: Some(previous),
                events,
            };

            match self.store.save(&change.flow, expected).await {
                Ok(()) => break change,
                Err(FlowStoreError::Conflict(message)) => {
                    self.back_off(deadline, attempt, message).await?
                }
                Err(err) => return Err(EngineError::Store(err)),
            }
        };

        let flow = self.finish(change).await?;
        info!(
            status = flow.status().as_str(),
            version = flow.version(),
            "approval flow updated"
        );
        Ok(flow)
    }

    async fn load_existing(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<FlowInstance, EngineError> {
        let flow = self
            .store
            .load(tenant_id, flow_id)
            .await
            .map_err(EngineError::Store)?
            .ok_or(ApprovalError::FlowNotFound)?;
        ensure_tenant(tenant_id, flow)
    }

    async fn bounded<T, Fut>(&self, fut: Fut) -> Result<T, EngineError>
    where
        Fut: Future<Output = Result<T, EngineError>>,
    {
        self.before(Instant::now() + self.settings.request_timeout, fut)
            .await
    }

    async fn before<T, Fut>(&self, deadline: Instant, fut: Fut) -> Result<T, EngineError>
    where
        Fut: Future<Output = Result<T, EngineError>>,
    {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.settings.request_timeout, "flow operation timed out");
                Err(EngineError::Timeout(self.settings.request_timeout))
            }
        }
    }

    /// Sleep before the next attempt, or give up once attempts are exhausted.
    async fn back_off(
        &self,
        deadline: Instant,
        attempt: u32,
        message: String,
    ) -> Result<(), EngineError> {
        if attempt >= self.settings.max_attempts {
            warn!(attempts = attempt, %message, "giving up after repeated version conflicts");
            return Err(EngineError::Conflict {
                attempts: attempt,
                message,
            });
        }
        warn!(attempt, %message, "version conflict, retrying");
        let delay = self.settings.retry_backoff * attempt;
        self.before(deadline, async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }

    /// Audit and publish a write that landed.
    async fn finish(&self, change: Change) -> Result<FlowInstance, EngineError> {
        let Change {
            flow,
            previous,
            events,
        } = change;

        for event in &events {
            if let Some(entry) = AuditEntry::from_event(event, &flow) {
                self.record_audit(&entry).await;
            }
        }

        let Some(tenant_id) = flow.tenant_id() else {
            return Ok(flow);
        };
        for event in &events {
            let envelope = EventEnvelope::new(
                Uuid::now_v7(),
                tenant_id,
                flow.id_typed().0,
                FLOW_AGGREGATE_TYPE,
                flow.version(),
                event.event_type(),
                event.occurred_at(),
                FlowTransition {
                    flow_id: flow.id_typed(),
                    object: flow.object().clone(),
                    event_type: event.event_type().to_string(),
                    previous_status: previous,
                    status: flow.status(),
                },
            );
            self.bus
                .publish(envelope)
                .map_err(|e| EngineError::Publish(format!("{e:?}")))?;
        }

        Ok(flow)
    }

    async fn record_audit(&self, entry: &AuditEntry) {
        let max = self.settings.audit_max_attempts.max(1);
        for attempt in 1..=max {
            match self.audit.append(entry).await {
                Ok(()) => return,
                Err(err) if attempt < max => {
                    warn!(attempt, error = %err, "audit append failed, retrying");
                    tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                }
                Err(err) => {
                    error!(
                        flow_id = %entry.flow_id,
                        entry_id = %entry.entry_id,
                        action = entry.action.as_str(),
                        error = %err,
                        "audit entry could not be recorded"
                    );
                }
            }
        }
    }
}

/// Reject records a buggy backend returned for the wrong tenant.
fn ensure_tenant(tenant_id: TenantId, flow: FlowInstance) -> Result<FlowInstance, EngineError> {
    if flow.tenant_id() != Some(tenant_id) {
        return Err(EngineError::Store(FlowStoreError::TenantIsolation(format!(
            "flow {} does not belong to tenant {tenant_id}",
            flow.id_typed()
        ))));
    }
    Ok(flow)
}
