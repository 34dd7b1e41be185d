use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use gateflow_approvals::{FlowId, FlowInstance, ObjectRef};
use gateflow_core::{AggregateRoot, ExpectedVersion, TenantId};

use super::{FlowStore, FlowStoreError, owning_tenant};

#[derive(Debug, Default)]
struct Tables {
    flows: HashMap<(TenantId, FlowId), FlowInstance>,
    by_object: HashMap<(TenantId, ObjectRef), FlowId>,
}

/// In-memory flow store.
///
/// Intended for tests/dev. The version check and the write happen under one
/// lock, so it gives the same compare-and-swap guarantee as the database.
#[derive(Debug, Default)]
pub struct InMemoryFlowStore {
    tables: RwLock<Tables>,
}

impl InMemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.read().map(|t| t.flows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> FlowStoreError {
    FlowStoreError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn load(
        &self,
        tenant_id: TenantId,
        flow_id: FlowId,
    ) -> Result<Option<FlowInstance>, FlowStoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.flows.get(&(tenant_id, flow_id)).cloned())
    }

    async fn find_by_object(
        &self,
        tenant_id: TenantId,
        object: &ObjectRef,
    ) -> Result<Option<FlowInstance>, FlowStoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .by_object
            .get(&(tenant_id, object.clone()))
            .and_then(|id| tables.flows.get(&(tenant_id, *id)))
            .cloned())
    }

    async fn save(
        &self,
        flow: &FlowInstance,
        expected: ExpectedVersion,
    ) -> Result<(), FlowStoreError> {
        let tenant_id = owning_tenant(flow)?;
        let flow_id = flow.id_typed();
        let object_key = (tenant_id, flow.object().clone());

        let mut tables = self.tables.write().map_err(|_| poisoned())?;

        let current = tables.flows.get(&(tenant_id, flow_id)).map(|f| f.version());
        if !expected.matches(current) {
            return Err(FlowStoreError::Conflict(format!(
                "expected {expected:?}, found {current:?}"
            )));
        }

        match tables.by_object.get(&object_key) {
            Some(existing) if *existing != flow_id => {
                return Err(FlowStoreError::Conflict(format!(
                    "document {} already has flow {existing}",
                    flow.object()
                )));
            }
            _ => {}
        }

        tables.by_object.insert(object_key, flow_id);
        tables.flows.insert((tenant_id, flow_id), flow.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gateflow_approvals::{CreateFlow, FlowCommand, TemplateRegistry};
    use gateflow_core::{Aggregate, AggregateId};

    fn new_flow(tenant_id: TenantId, object_id: &str) -> FlowInstance {
        let mut flow = FlowInstance::empty(FlowId::new(AggregateId::new()));
        let template = TemplateRegistry::builtin()
            .get("purchase_order")
            .cloned()
            .unwrap();
        let cmd = FlowCommand::CreateFlow(CreateFlow {
            tenant_id,
            flow_id: flow.id_typed(),
            object: ObjectRef::new("purchase_order", object_id),
            template,
            occurred_at: Utc::now(),
        });
        for e in flow.handle(&cmd).unwrap() {
            flow.apply(&e);
        }
        flow
    }

    #[tokio::test]
    async fn save_requires_matching_version() {
        let store = InMemoryFlowStore::new();
        let tenant = TenantId::new();
        let flow = new_flow(tenant, "PO-1");

        store.save(&flow, ExpectedVersion::NoRecord).await.unwrap();
        let err = store.save(&flow, ExpectedVersion::NoRecord).await.unwrap_err();
        assert!(matches!(err, FlowStoreError::Conflict(_)));

        store.save(&flow, ExpectedVersion::Exact(1)).await.unwrap();
        let err = store.save(&flow, ExpectedVersion::Exact(7)).await.unwrap_err();
        assert!(matches!(err, FlowStoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn one_flow_per_document() {
        let store = InMemoryFlowStore::new();
        let tenant = TenantId::new();

        store.save(&new_flow(tenant, "PO-1"), ExpectedVersion::NoRecord).await.unwrap();
        let err = store
            .save(&new_flow(tenant, "PO-1"), ExpectedVersion::NoRecord)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowStoreError::Conflict(_)));

        // Same document id in another tenant is a different document.
        store
            .save(&new_flow(TenantId::new(), "PO-1"), ExpectedVersion::NoRecord)
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn lookups_are_tenant_scoped() {
        let store = InMemoryFlowStore::new();
        let tenant = TenantId::new();
        let flow = new_flow(tenant, "PO-9");
        store.save(&flow, ExpectedVersion::NoRecord).await.unwrap();

        let object = ObjectRef::new("purchase_order", "PO-9");
        assert_eq!(
            store.find_by_object(tenant, &object).await.unwrap(),
            Some(flow.clone())
        );
        assert!(store.find_by_object(TenantId::new(), &object).await.unwrap().is_none());
        assert!(store.load(TenantId::new(), flow.id_typed()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn uncreated_flows_are_rejected() {
        let store = InMemoryFlowStore::new();
        let flow = FlowInstance::empty(FlowId::new(AggregateId::new()));
        assert!(matches!(
            store.save(&flow, ExpectedVersion::Any).await,
            Err(FlowStoreError::InvalidRecord(_))
        ));
    }
}
