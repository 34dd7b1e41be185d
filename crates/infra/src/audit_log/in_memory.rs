use std::sync::RwLock;

use async_trait::async_trait;

use gateflow_approvals::{AuditEntry, FlowId};
use gateflow_core::TenantId;

use super::{AuditLog, AuditLogError};

/// In-memory audit log for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditLogError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditLogError::Backend("lock poisoned".to_string()))?;
        if entries.iter().any(|e| e.entry_id == entry.entry_id) {
            return Ok(());
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn list_for_flow(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<Vec<AuditEntry>, AuditLogError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuditLogError::Backend("lock poisoned".to_string()))?;
        Ok(entries
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.flow_id == flow_id)
            .cloned()
            .collect())
    }
}
