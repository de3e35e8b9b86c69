//! # In-Memory Store Actor
//!
//! A local backend that behaves like the managed database: tenant-scoped tables,
//! atomic procedures, typed errors.
//!
//! ## Concurrency Model
//! The actor owns all tables and processes [`StoreRequest`]s one at a time from an mpsc
//! channel. Callers may keep many requests in flight through cloned [`StoreClient`]s;
//! each request is still applied atomically, which is what a stored procedure gives the
//! real system.

use super::tables::{ProductRecord, StockMovement, TenantTables};
use super::{
    Lookup, NewRecord, Procedure, ProcedureOutput, RecordKind, RecordPatch, StoreClient,
    StoreResult,
};
use crate::model::TenantScope;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// One-shot response channel used by the actor.
pub type Response<T> = oneshot::Sender<StoreResult<T>>;

/// Messages understood by the [`StoreActor`].
///
/// The first five variants mirror the [`DataStore`](super::DataStore) capabilities;
/// the rest seed and inspect the tables.
#[derive(Debug)]
pub enum StoreRequest {
    Update {
        scope: TenantScope,
        id: String,
        patch: RecordPatch,
        respond_to: Response<()>,
    },
    Procedure {
        scope: TenantScope,
        procedure: Procedure,
        respond_to: Response<ProcedureOutput>,
    },
    Query {
        scope: TenantScope,
        lookup: Lookup,
        respond_to: Response<Vec<String>>,
    },
    Insert {
        scope: TenantScope,
        records: Vec<NewRecord>,
        respond_to: Response<Vec<String>>,
    },
    Delete {
        scope: TenantScope,
        kind: RecordKind,
        ids: Vec<String>,
        respond_to: Response<()>,
    },
    RegisterWarehouse {
        scope: TenantScope,
        warehouse_id: String,
        respond_to: Response<()>,
    },
    GetProduct {
        scope: TenantScope,
        id: String,
        respond_to: Response<Option<ProductRecord>>,
    },
    StockLevel {
        scope: TenantScope,
        product_id: String,
        warehouse_id: String,
        respond_to: Response<i64>,
    },
    Movements {
        scope: TenantScope,
        respond_to: Response<Vec<StockMovement>>,
    },
}

/// The actor half of the in-memory store.
pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    tenants: HashMap<TenantScope, TenantTables>,
    next_id_fn: Box<dyn Fn() -> String + Send + Sync>,
}

impl StoreActor {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> String + Send + Sync + 'static,
    ) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            tenants: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        (actor, StoreClient::new(sender))
    }

    /// Creates a store that numbers records `product_1`, `product_2`, ...
    pub fn with_sequential_ids(buffer_size: usize) -> (Self, StoreClient) {
        let counter = Arc::new(AtomicU64::new(1));
        Self::new(buffer_size, move || {
            let id = counter.fetch_add(1, Ordering::SeqCst);
            format!("product_{}", id)
        })
    }

    fn tables(&mut self, scope: TenantScope) -> &mut TenantTables {
        self.tenants.entry(scope).or_default()
    }

    /// Runs the event loop until every client has been dropped.
    pub async fn run(mut self) {
        info!("Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Update {
                    scope,
                    id,
                    patch,
                    respond_to,
                } => {
                    debug!(tenant = %scope, %id, ?patch, "Update");
                    let result = self.tables(scope).update(&id, patch);
                    log_outcome("update", &result);
                    let _ = respond_to.send(result);
                }
                StoreRequest::Procedure {
                    scope,
                    procedure,
                    respond_to,
                } => {
                    let name = procedure.name();
                    debug!(tenant = %scope, procedure = name, "Procedure");
                    let result = self.tables(scope).call(procedure);
                    log_outcome(name, &result);
                    let _ = respond_to.send(result);
                }
                StoreRequest::Query {
                    scope,
                    lookup,
                    respond_to,
                } => {
                    debug!(tenant = %scope, ?lookup, "Query");
                    let _ = respond_to.send(Ok(self.tables(scope).query(lookup)));
                }
                StoreRequest::Insert {
                    scope,
                    records,
                    respond_to,
                } => {
                    debug!(tenant = %scope, count = records.len(), "Insert");
                    let tables = self.tenants.entry(scope).or_default();
                    let result = tables.insert(records, || (self.next_id_fn)());
                    if let Ok(ids) = &result {
                        info!(count = ids.len(), "Inserted");
                    }
                    log_outcome("insert", &result);
                    let _ = respond_to.send(result);
                }
                StoreRequest::Delete {
                    scope,
                    kind,
                    ids,
                    respond_to,
                } => {
                    debug!(tenant = %scope, ?kind, ?ids, "Delete");
                    let result = self.tables(scope).delete(kind, ids);
                    log_outcome("delete", &result);
                    let _ = respond_to.send(result);
                }
                StoreRequest::RegisterWarehouse {
                    scope,
                    warehouse_id,
                    respond_to,
                } => {
                    debug!(tenant = %scope, %warehouse_id, "RegisterWarehouse");
                    self.tables(scope).register_warehouse(warehouse_id);
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::GetProduct {
                    scope,
                    id,
                    respond_to,
                } => {
                    let _ = respond_to.send(Ok(self.tables(scope).product(&id)));
                }
                StoreRequest::StockLevel {
                    scope,
                    product_id,
                    warehouse_id,
                    respond_to,
                } => {
                    let level = self.tables(scope).stock_level(&product_id, &warehouse_id);
                    let _ = respond_to.send(Ok(level));
                }
                StoreRequest::Movements { scope, respond_to } => {
                    let _ = respond_to.send(Ok(self.tables(scope).movements()));
                }
            }
        }

        info!(tenants = self.tenants.len(), "Store shutdown");
    }
}

fn log_outcome<T>(operation: &str, result: &StoreResult<T>) {
    if let Err(e) = result {
        warn!(operation, error = %e, "Store call failed");
    }
}
