//! Infrastructure wiring for the API.
//!
//! The engine is built over trait objects so in-memory and Postgres backends
//! share one concrete type.

use std::sync::Arc;
use std::thread;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;

use gateflow_approvals::TemplateRegistry;
use gateflow_auth::RolePolicy;
use gateflow_events::{EventBus, InMemoryEventBus};
use gateflow_infra::{
    EngineSettings, FlowEngine, TransitionEnvelope,
    audit_log::{AuditLog, InMemoryAuditLog, PostgresAuditLog},
    config::{AppConfig, ConfigError},
    flow_store::{FlowStore, FlowStoreError, InMemoryFlowStore, PostgresFlowStore},
};

pub type TransitionBus = InMemoryEventBus<TransitionEnvelope>;

pub type Engine = FlowEngine<Arc<dyn FlowStore>, Arc<dyn AuditLog>, Arc<TransitionBus>>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect to postgres: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("failed to prepare schema: {0}")]
    Schema(#[from] FlowStoreError),
}

pub struct AppServices {
    engine: Engine,
    policy: RolePolicy,
    persistent: bool,
}

impl AppServices {
    /// In-memory stores; state is lost on restart.
    pub fn in_memory(templates: TemplateRegistry, settings: EngineSettings) -> Self {
        let store: Arc<dyn FlowStore> = Arc::new(InMemoryFlowStore::new());
        let audit: Arc<dyn AuditLog> = Arc::new(InMemoryAuditLog::new());
        Self::assemble(store, audit, templates, settings, false)
    }

    /// Postgres-backed stores; creates the tables when missing.
    pub async fn postgres(
        database_url: &str,
        templates: TemplateRegistry,
        settings: EngineSettings,
    ) -> Result<Self, ServiceError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(settings.request_timeout)
            .connect(database_url)
            .await?;

        let flows = PostgresFlowStore::new(pool.clone());
        flows.ensure_schema().await?;

        let store: Arc<dyn FlowStore> = Arc::new(flows);
        let audit: Arc<dyn AuditLog> = Arc::new(PostgresAuditLog::new(pool));
        Ok(Self::assemble(store, audit, templates, settings, true))
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let templates = config.load_templates()?;
        info!(templates = templates.len(), "approval templates loaded");

        match &config.database {
            Some(db) => Self::postgres(&db.url, templates, config.engine.clone()).await,
            None => Ok(Self::in_memory(templates, config.engine.clone())),
        }
    }

    fn assemble(
        store: Arc<dyn FlowStore>,
        audit: Arc<dyn AuditLog>,
        templates: TemplateRegistry,
        settings: EngineSettings,
        persistent: bool,
    ) -> Self {
        let bus: Arc<TransitionBus> = Arc::new(InMemoryEventBus::new());
        spawn_transition_log(&bus);

        let policy = RolePolicy::default();
        let engine = FlowEngine::new(store, audit, bus, Arc::new(templates), settings)
            .with_policy(policy.clone());

        info!(persistent, "flow engine ready");
        Self {
            engine,
            policy,
            persistent,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    pub fn templates(&self) -> &TemplateRegistry {
        self.engine.templates()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

/// Log every published status transition.
///
/// Stands in for the document lifecycles that consume transitions; the thread
/// ends when the bus is dropped.
fn spawn_transition_log(bus: &Arc<TransitionBus>) {
    let sub = bus.subscribe();
    thread::spawn(move || {
        while let Ok(env) = sub.recv() {
            let t = env.payload();
            info!(
                tenant_id = %env.tenant_id(),
                flow_id = %t.flow_id,
                object = %t.object,
                event_type = env.event_type(),
                from = t.previous_status.map(|s| s.as_str()),
                to = t.status.as_str(),
                "flow status transition"
            );
        }
    });
}
