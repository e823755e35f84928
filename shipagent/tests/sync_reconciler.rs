mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{build_world, seed, ScriptedApi};
use serde_json::{json, Value};
use shipagent::sync::SyncReconciler;
use shipstore::models::Direction;
use shipstore::store::DocumentStore;
use shipstore::{CacheGateway, MemoryStore, StorageError};
use tokio_util::sync::CancellationToken;
use wmsfetcher::{DateWindow, FederationConfig, StoreAccount, WarehouseApi};

fn reconciler_from(world: &common::World, stores: &[&str]) -> SyncReconciler {
    SyncReconciler::new(
        Arc::clone(&world.api) as Arc<dyn WarehouseApi>,
        Arc::clone(&world.gateway),
        common::config_with(stores),
    )
}

#[tokio::test]
async fn counts_created_and_updated_records() {
    let mut api = ScriptedApi::default();
    api.searches.insert(
        "JEEP:outbounds:-".into(),
        vec![json!({"clientId": "J1"}), json!({"clientId": "J2"})],
    );
    api.searches
        .insert("JEEP:inbounds:-".into(), vec![json!({"clientId": "RET-1"})]);
    let world = build_world(api, &["JEEP"]);

    // J1 is already cached, so the pull must count it as updated.
    seed(
        &world.gateway,
        Direction::Outbound,
        "JEEP",
        json!({"clientId": "J1", "statusDescription": "Packed"}),
    )
    .await;

    let reconciler = reconciler_from(&world, &["JEEP"]);
    let report = reconciler
        .run(&DateWindow::last_days(30), &CancellationToken::new())
        .await;

    assert!(report.success);
    assert_eq!(report.records_created, 2);
    assert_eq!(report.records_updated, 1);
    assert!(report.errors.is_empty());
    assert!(world
        .gateway
        .get_record(Direction::Inbound, "RET-1")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn credential_less_stores_are_skipped_entirely() {
    let world = build_world(ScriptedApi::default(), &["JEEP"]);

    let mut config = common::config_with(&["JEEP"]);
    config.stores.push(StoreAccount::new("HURLEY"));
    let reconciler = SyncReconciler::new(
        Arc::clone(&world.api) as Arc<dyn WarehouseApi>,
        Arc::clone(&world.gateway),
        config,
    );

    let report = reconciler
        .run(&DateWindow::last_days(30), &CancellationToken::new())
        .await;

    assert!(report.success);
    assert!(world
        .api
        .calls()
        .iter()
        .all(|call| !call.contains("HURLEY")));
}

/// Memory store whose inbound collection is down. Delegates everything
/// else.
struct FailingStore {
    inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get(&self, collection: &str, id: &str) -> shipstore::Result<Option<Value>> {
        self.inner.get(collection, id).await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> shipstore::Result<Option<Value>> {
        self.inner.find_by_field(collection, field, value).await
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        document: Value,
        merge: bool,
    ) -> shipstore::Result<()> {
        if collection == "inbound-records" {
            return Err(StorageError::Backend("inbound store offline".into()));
        }
        self.inner.upsert(collection, id, document, merge).await
    }

    async fn delete(&self, collection: &str, id: &str) -> shipstore::Result<()> {
        self.inner.delete(collection, id).await
    }
}

#[tokio::test]
async fn one_failing_unit_does_not_block_the_others() {
    let mut api = ScriptedApi::default();
    api.searches
        .insert("JEEP:outbounds:-".into(), vec![json!({"clientId": "J1"})]);
    api.searches
        .insert("JEEP:inbounds:-".into(), vec![json!({"clientId": "RET-1"})]);

    let gateway = Arc::new(CacheGateway::new(Arc::new(FailingStore {
        inner: MemoryStore::new(),
    }) as Arc<dyn DocumentStore>));
    let reconciler = SyncReconciler::new(
        Arc::new(api) as Arc<dyn WarehouseApi>,
        Arc::clone(&gateway),
        common::config_with(&["JEEP"]),
    );

    let report = reconciler
        .run(&DateWindow::last_days(30), &CancellationToken::new())
        .await;

    // Success-with-errors: the outbound unit landed, the inbound one is
    // reported, nothing aborted.
    assert!(report.success);
    assert_eq!(report.records_created, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("JEEP/inbounds"));
    assert!(gateway
        .get_record(Direction::Outbound, "J1")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn cancelled_runs_report_failure() {
    let world = build_world(ScriptedApi::default(), &["JEEP"]);
    let reconciler = reconciler_from(&world, &["JEEP"]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = reconciler.run(&DateWindow::last_days(30), &cancel).await;

    assert!(!report.success);
    assert_eq!(report.records_created, 0);
    assert!(report.message.starts_with("Sync cancelled"));
}

#[tokio::test]
async fn no_credentialed_stores_is_a_clean_no_op() {
    let world = build_world(ScriptedApi::default(), &[]);
    let reconciler = SyncReconciler::new(
        Arc::clone(&world.api) as Arc<dyn WarehouseApi>,
        Arc::clone(&world.gateway),
        FederationConfig::new("https://storeapi.example/api/v1", vec![]),
    );

    let report = reconciler
        .run(&DateWindow::last_days(30), &CancellationToken::new())
        .await;

    assert!(report.success);
    assert_eq!(report.records_created + report.records_updated, 0);
    assert!(world.api.calls().is_empty());
}
