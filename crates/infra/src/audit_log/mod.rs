//! Append-only audit trail storage.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryAuditLog;
pub use postgres::PostgresAuditLog;

use async_trait::async_trait;
use thiserror::Error;

use gateflow_approvals::{AuditEntry, FlowId};
use gateflow_core::TenantId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditLogError {
    #[error("invalid audit entry: {0}")]
    InvalidEntry(String),

    #[error("audit backend failure: {0}")]
    Backend(String),
}

/// Entries are never updated or deleted. Appending the same `entry_id` twice
/// stores it once, so callers may retry freely.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditLogError>;

    /// Entries of one flow in insertion order.
    async fn list_for_flow(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<Vec<AuditEntry>, AuditLogError>;
}

#[async_trait]
impl<L> AuditLog for std::sync::Arc<L>
where
    L: AuditLog + ?Sized,
{
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditLogError> {
        (**self).append(entry).await
    }

    async fn list_for_flow(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<Vec<AuditEntry>, AuditLogError> {
        (**self).list_for_flow(tenant_id, flow_id).await
    }
}
