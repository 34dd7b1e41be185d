//! Postgres-backed audit log (`approval_audit`).
//!
//! The table is created together with `approval_flows` by
//! `PostgresFlowStore::ensure_schema`.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use gateflow_approvals::{AuditEntry, FlowId};
use gateflow_core::TenantId;

use super::{AuditLog, AuditLogError};

#[derive(Debug, Clone)]
pub struct PostgresAuditLog {
    pool: Arc<PgPool>,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    #[instrument(
        skip(self, entry),
        fields(entry_id = %entry.entry_id, flow_id = %entry.flow_id, action = entry.action.as_str()),
        err
    )]
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditLogError> {
        let payload = serde_json::to_value(entry)
            .map_err(|e| AuditLogError::InvalidEntry(format!("serialize entry: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO approval_audit (
                entry_id, tenant_id, flow_id, action, actor,
                resulting_status, entry, recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (entry_id) DO NOTHING
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.tenant_id.as_uuid())
        .bind(entry.flow_id.0.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.actor.as_uuid())
        .bind(entry.resulting_status.as_str())
        .bind(&payload)
        .bind(entry.timestamp)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, flow_id = %flow_id), err)]
    async fn list_for_flow(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<Vec<AuditEntry>, AuditLogError> {
        let rows = sqlx::query(
            r#"
            SELECT entry
            FROM approval_audit
            WHERE tenant_id = $1 AND flow_id = $2
            ORDER BY seq ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(flow_id.0.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_for_flow", e))?;

        rows.iter()
            .map(|row| {
                let value: serde_json::Value = row
                    .try_get("entry")
                    .map_err(|e| AuditLogError::InvalidEntry(format!("entry column: {e}")))?;
                serde_json::from_value(value)
                    .map_err(|e| AuditLogError::InvalidEntry(format!("entry payload: {e}")))
            })
            .collect()
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AuditLogError {
    match err {
        sqlx::Error::Database(db_err) => AuditLogError::Backend(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        _ => AuditLogError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
