//! Postgres-backed flow store.
//!
//! Flows live in `approval_flows` as a JSONB snapshot next to the columns used
//! for lookups and the version check.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | FlowStoreError | Scenario |
//! |------------|----------------------|----------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Concurrent insert, or the document already has a flow |
//! | Database (check violation) | `23514` | `InvalidRecord` | Version not positive |
//! | Database (other) | Any other | `Backend` | |
//! | PoolClosed / other | N/A | `Backend` | Network errors, connection failures, etc. |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use gateflow_approvals::{FlowId, FlowInstance, ObjectRef};
use gateflow_core::{AggregateRoot, ExpectedVersion, TenantId};

use super::{FlowStore, FlowStoreError, owning_tenant};

const SCHEMA: &str = include_str!("../../migrations/0001_approval_flows.sql");

#[derive(Debug, Clone)]
pub struct PostgresFlowStore {
    pool: Arc<PgPool>,
}

impl PostgresFlowStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the flow and audit tables if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), FlowStoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode(row: &sqlx::postgres::PgRow) -> Result<FlowInstance, FlowStoreError> {
    let snapshot: serde_json::Value = row
        .try_get("snapshot")
        .map_err(|e| FlowStoreError::InvalidRecord(format!("snapshot column: {e}")))?;
    serde_json::from_value(snapshot)
        .map_err(|e| FlowStoreError::InvalidRecord(format!("snapshot payload: {e}")))
}

#[async_trait]
impl FlowStore for PostgresFlowStore {
    #[instrument(skip(self), fields(tenant_id = %tenant_id, flow_id = %flow_id), err)]
    async fn load(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<Option<FlowInstance>, FlowStoreError> {
        let row = sqlx::query(
            r#"
            SELECT snapshot
            FROM approval_flows
            WHERE tenant_id = $1 AND flow_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(flow_id.0.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load", e))?;

        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, object = %object), err)]
    async fn find_by_object(
        &self,
        tenant_id: TenantId,
        object: &ObjectRef,
    ) -> Result<Option<FlowInstance>, FlowStoreError> {
        let row = sqlx::query(
            r#"
            SELECT snapshot
            FROM approval_flows
            WHERE tenant_id = $1 AND object_type = $2 AND object_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(&object.object_type)
        .bind(&object.object_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_object", e))?;

        row.as_ref().map(decode).transpose()
    }

    #[instrument(
        skip(self, flow),
        fields(
            flow_id = %flow.id_typed(),
            version = flow.version(),
            expected = ?expected,
            rows_affected = tracing::field::Empty
        ),
        err
    )]
    async fn save(
        &self,
        flow: &FlowInstance,
        expected: ExpectedVersion,
    ) -> Result<(), FlowStoreError> {
        let tenant_id = owning_tenant(flow)?;
        let snapshot = serde_json::to_value(flow)
            .map_err(|e| FlowStoreError::InvalidRecord(format!("serialize snapshot: {e}")))?;
        let object = flow.object();

        let result = match expected {
            ExpectedVersion::NoRecord => sqlx::query(
                r#"
                INSERT INTO approval_flows (
                    tenant_id, flow_id, object_type, object_id, config_slug,
                    status, version, snapshot, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(flow.id_typed().0.as_uuid())
            .bind(&object.object_type)
            .bind(&object.object_id)
            .bind(flow.config_slug())
            .bind(flow.status().as_str())
            .bind(flow.version() as i64)
            .bind(&snapshot)
            .bind(flow.created_at())
            .bind(flow.updated_at())
            .execute(&*self.pool)
            .await,
            ExpectedVersion::Exact(v) => sqlx::query(
                r#"
                UPDATE approval_flows
                SET status = $3, version = $4, snapshot = $5, updated_at = $6
                WHERE tenant_id = $1 AND flow_id = $2 AND version = $7
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(flow.id_typed().0.as_uuid())
            .bind(flow.status().as_str())
            .bind(flow.version() as i64)
            .bind(&snapshot)
            .bind(flow.updated_at())
            .bind(v as i64)
            .execute(&*self.pool)
            .await,
            ExpectedVersion::Any => sqlx::query(
                r#"
                INSERT INTO approval_flows (
                    tenant_id, flow_id, object_type, object_id, config_slug,
                    status, version, snapshot, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (tenant_id, flow_id)
                DO UPDATE SET
                    status = EXCLUDED.status,
                    version = EXCLUDED.version,
                    snapshot = EXCLUDED.snapshot,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(flow.id_typed().0.as_uuid())
            .bind(&object.object_type)
            .bind(&object.object_id)
            .bind(flow.config_slug())
            .bind(flow.status().as_str())
            .bind(flow.version() as i64)
            .bind(&snapshot)
            .bind(flow.created_at())
            .bind(flow.updated_at())
            .execute(&*self.pool)
            .await,
        }
        .map_err(|e| map_sqlx_error("save", e))?;

        Span::current().record("rows_affected", result.rows_affected());
        if result.rows_affected() == 0 {
            return Err(FlowStoreError::Conflict(format!(
                "flow {} is no longer at {expected:?}",
                flow.id_typed()
            )));
        }
        Ok(())
    }
}

/// Map SQLx errors to `FlowStoreError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> FlowStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => FlowStoreError::Conflict(msg),
                Some("23514") => FlowStoreError::InvalidRecord(msg),
                _ => FlowStoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            FlowStoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => FlowStoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
