use super::actor::{Response, StoreRequest};
use super::tables::{ProductRecord, StockMovement};
use super::{
    DataStore, Lookup, NewRecord, Procedure, ProcedureOutput, RecordKind, RecordPatch,
    StoreError, StoreResult,
};
use crate::model::TenantScope;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// Cloneable handle to a running [`StoreActor`](super::StoreActor).
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(&self, build: impl FnOnce(Response<T>) -> StoreRequest) -> StoreResult<T> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| StoreError::unavailable("Store closed"))?;
        response
            .await
            .map_err(|_| StoreError::unavailable("Store dropped response channel"))?
    }

    #[instrument(skip(self))]
    pub async fn register_warehouse(
        &self,
        scope: &TenantScope,
        warehouse_id: impl Into<String> + std::fmt::Debug,
    ) -> StoreResult<()> {
        let scope = scope.clone();
        let warehouse_id = warehouse_id.into();
        self.request(|respond_to| StoreRequest::RegisterWarehouse {
            scope,
            warehouse_id,
            respond_to,
        })
        .await
    }

    pub async fn product(&self, scope: &TenantScope, id: &str) -> StoreResult<Option<ProductRecord>> {
        let scope = scope.clone();
        let id = id.to_string();
        self.request(|respond_to| StoreRequest::GetProduct {
            scope,
            id,
            respond_to,
        })
        .await
    }

    /// Current stock for a product in a warehouse; zero when no row exists.
    pub async fn stock_level(
        &self,
        scope: &TenantScope,
        product_id: &str,
        warehouse_id: &str,
    ) -> StoreResult<i64> {
        let scope = scope.clone();
        let product_id = product_id.to_string();
        let warehouse_id = warehouse_id.to_string();
        self.request(|respond_to| StoreRequest::StockLevel {
            scope,
            product_id,
            warehouse_id,
            respond_to,
        })
        .await
    }

    pub async fn movements(&self, scope: &TenantScope) -> StoreResult<Vec<StockMovement>> {
        let scope = scope.clone();
        self.request(|respond_to| StoreRequest::Movements { scope, respond_to })
            .await
    }
}

#[async_trait]
impl DataStore for StoreClient {
    #[instrument(skip(self, patch))]
    async fn update_record(
        &self,
        scope: &TenantScope,
        id: &str,
        patch: RecordPatch,
    ) -> StoreResult<()> {
        debug!("Sending request");
        let scope = scope.clone();
        let id = id.to_string();
        self.request(|respond_to| StoreRequest::Update {
            scope,
            id,
            patch,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, procedure), fields(procedure = procedure.name()))]
    async fn call_procedure(
        &self,
        scope: &TenantScope,
        procedure: Procedure,
    ) -> StoreResult<ProcedureOutput> {
        debug!("Sending request");
        let scope = scope.clone();
        self.request(|respond_to| StoreRequest::Procedure {
            scope,
            procedure,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn query_existing(&self, scope: &TenantScope, lookup: Lookup) -> StoreResult<Vec<String>> {
        debug!("Sending request");
        let scope = scope.clone();
        self.request(|respond_to| StoreRequest::Query {
            scope,
            lookup,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert_records(
        &self,
        scope: &TenantScope,
        records: Vec<NewRecord>,
    ) -> StoreResult<Vec<String>> {
        debug!("Sending request");
        let scope = scope.clone();
        self.request(|respond_to| StoreRequest::Insert {
            scope,
            records,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_records(
        &self,
        scope: &TenantScope,
        kind: RecordKind,
        ids: Vec<String>,
    ) -> StoreResult<()> {
        debug!("Sending request");
        let scope = scope.clone();
        self.request(|respond_to| StoreRequest::Delete {
            scope,
            kind,
            ids,
            respond_to,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdjustmentType, InventoryAdjustment, QuantityChange};
    use crate::store::mock::{create_mock_store_client, expect_procedure, expect_update};
    use crate::store::{AdjustmentLine, LineStatus, StoreErrorKind};

    #[tokio::test]
    async fn test_call_procedure_sends_grouped_lines() {
        let (client, mut receiver) = create_mock_store_client(10);
        let scope = TenantScope::new("org_1");

        let adjustment = InventoryAdjustment::new("p1", "w1", AdjustmentType::Remove, 5);
        let call_scope = scope.clone();
        let call_task = tokio::spawn(async move {
            client
                .call_procedure(
                    &call_scope,
                    Procedure::BulkAdjustInventory {
                        warehouse_id: adjustment.warehouse_id.clone(),
                        lines: vec![AdjustmentLine {
                            product_id: adjustment.product_id.clone(),
                            change: adjustment.normalized(),
                            reason: None,
                        }],
                    },
                )
                .await
        });

        let (received_scope, procedure, responder) = expect_procedure(&mut receiver)
            .await
            .expect("Expected Procedure request");
        assert_eq!(received_scope, scope);
        match procedure {
            Procedure::BulkAdjustInventory { warehouse_id, lines } => {
                assert_eq!(warehouse_id, "w1");
                assert_eq!(lines[0].change, QuantityChange::Delta(-5));
            }
            other => panic!("unexpected procedure {:?}", other),
        }
        responder
            .send(Ok(ProcedureOutput::LineStatuses(vec![LineStatus::ok("p1")])))
            .unwrap();

        let output = call_task.await.unwrap().unwrap();
        assert_eq!(
            output,
            ProcedureOutput::LineStatuses(vec![LineStatus::ok("p1")])
        );
    }

    #[tokio::test]
    async fn test_dropped_responder_maps_to_unavailable() {
        let (client, mut receiver) = create_mock_store_client(10);
        let call_task = tokio::spawn(async move {
            client
                .update_record(
                    &TenantScope::new("org_1"),
                    "p1",
                    RecordPatch::Product(Default::default()),
                )
                .await
        });

        let (_, id, _, responder) = expect_update(&mut receiver)
            .await
            .expect("Expected Update request");
        assert_eq!(id, "p1");
        drop(responder);

        let err = call_task.await.unwrap().unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_closed_store_maps_to_unavailable() {
        let (client, receiver) = create_mock_store_client(1);
        drop(receiver);

        let err = client
            .query_existing(&TenantScope::new("org_1"), Lookup::ProductSkus(vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Unavailable);
        assert_eq!(err.message, "Store closed");
    }
}
