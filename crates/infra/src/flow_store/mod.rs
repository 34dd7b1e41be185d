//! Flow persistence boundary.
//!
//! A flow is stored as a single versioned record. Writers pass the version
//! they loaded; the store refuses the write when somebody else got there first,
//! which is what keeps concurrent signers from losing each other's work.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryFlowStore;
pub use postgres::PostgresFlowStore;

use async_trait::async_trait;
use thiserror::Error;

use gateflow_approvals::{FlowId, FlowInstance, ObjectRef};
use gateflow_core::{ExpectedVersion, TenantId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowStoreError {
    /// Version check failed or the document already has a flow.
    #[error("concurrency conflict: {0}")]
    Conflict(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("invalid flow record: {0}")]
    InvalidRecord(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Tenant-scoped flow storage with optimistic versioning.
#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn load(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<Option<FlowInstance>, FlowStoreError>;

    async fn find_by_object(
        &self,
        tenant_id: TenantId,
        object: &ObjectRef,
    ) -> Result<Option<FlowInstance>, FlowStoreError>;

    /// Persist `flow` if the stored record is at `expected`.
    ///
    /// `NoRecord` also fails when another flow already gates the same document.
    async fn save(
        &self,
        flow: &FlowInstance,
        expected: ExpectedVersion,
    ) -> Result<(), FlowStoreError>;
}

#[async_trait]
impl<S> FlowStore for std::sync::Arc<S>
where
    S: FlowStore + ?Sized,
{
    async fn load(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<Option<FlowInstance>, FlowStoreError> {
        (**self).load(tenant_id, flow_id).await
    }

    async fn find_by_object(
        &self,
        tenant_id: TenantId,
        object: &ObjectRef,
    ) -> Result<Option<FlowInstance>, FlowStoreError> {
        (**self).find_by_object(tenant_id, object).await
    }

    async fn save(
        &self,
        flow: &FlowInstance,
        expected: ExpectedVersion,
    ) -> Result<(), FlowStoreError> {
        (**self).save(flow, expected).await
    }
}

/// Tenant of a flow about to be written.
pub(crate) fn owning_tenant(flow: &FlowInstance) -> Result<TenantId, FlowStoreError> {
    flow.tenant_id().ok_or_else(|| {
        FlowStoreError::InvalidRecord(format!("flow {} has not been created", flow.id_typed()))
    })
}
