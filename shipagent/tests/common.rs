//! Shared fixture for the integration tests: a scripted warehouse API and
//! an in-memory world wired the way the CLI wires the real one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use shipagent::progress::{ProgressEvent, Resolution};
use shipagent::resolver::Resolver;
use shipstore::models::Direction;
use shipstore::{CacheGateway, MemoryStore};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use wmsfetcher::{
    DateWindow, FederationConfig, FetchError, SearchPlanner, StoreAccount, WarehouseApi,
};

/// Canned warehouse responses keyed by "store:direction:term" (":id" for
/// details). Recent-tier searches read `searches`; any other window reads
/// `historical_searches` first and falls back to `searches`. Every call is
/// recorded in order, tagged with the tier it hit.
#[derive(Default)]
pub struct ScriptedApi {
    pub calls: Mutex<Vec<String>>,
    pub direct: HashMap<String, Value>,
    pub searches: HashMap<String, Vec<Value>>,
    pub historical_searches: HashMap<String, Vec<Value>>,
    pub details: HashMap<String, Value>,
    /// Cancel the token once this many calls have been recorded.
    pub cancel_after: Option<usize>,
}

impl ScriptedApi {
    pub fn key(store: &StoreAccount, direction: Direction, term: &str) -> String {
        format!("{}:{}:{}", store.name, direction.plural(), term)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: String, cancel: &CancellationToken) {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        if let Some(limit) = self.cancel_after {
            if calls.len() >= limit {
                cancel.cancel();
            }
        }
    }

    fn is_recent(window: &DateWindow) -> bool {
        window.from == DateWindow::recent().from
    }
}

#[async_trait]
impl WarehouseApi for ScriptedApi {
    async fn direct_probe(
        &self,
        store: &StoreAccount,
        direction: Direction,
        client_ref: &str,
        cancel: &CancellationToken,
    ) -> wmsfetcher::Result<Option<Value>> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let key = Self::key(store, direction, client_ref);
        self.record_call(format!("probe:{key}"), cancel);
        Ok(self.direct.get(&key).cloned())
    }

    async fn search_window(
        &self,
        store: &StoreAccount,
        direction: Direction,
        term: Option<&str>,
        window: &DateWindow,
        _page_size: u32,
        cancel: &CancellationToken,
    ) -> wmsfetcher::Result<Vec<Value>> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let key = Self::key(store, direction, term.unwrap_or("-"));
        if Self::is_recent(window) {
            self.record_call(format!("search:{key}:recent"), cancel);
            Ok(self.searches.get(&key).cloned().unwrap_or_default())
        } else {
            self.record_call(format!("search:{key}:historical"), cancel);
            Ok(self
                .historical_searches
                .get(&key)
                .or_else(|| self.searches.get(&key))
                .cloned()
                .unwrap_or_default())
        }
    }

    async fn fetch_detail(
        &self,
        store: &StoreAccount,
        direction: Direction,
        internal_id: &str,
        cancel: &CancellationToken,
    ) -> wmsfetcher::Result<Option<Value>> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let key = Self::key(store, direction, internal_id);
        self.record_call(format!("detail:{key}"), cancel);
        Ok(self.details.get(&key).cloned())
    }
}

pub fn config_with(names: &[&str]) -> FederationConfig {
    FederationConfig::new(
        "https://storeapi.example/api/v1",
        names
            .iter()
            .map(|name| StoreAccount::new(*name).with_credentials("key", "secret"))
            .collect(),
    )
}

pub struct World {
    pub resolver: Resolver,
    pub gateway: Arc<CacheGateway>,
    pub api: Arc<ScriptedApi>,
    pub store: Arc<MemoryStore>,
}

pub fn build_world(api: ScriptedApi, stores: &[&str]) -> World {
    let api = Arc::new(api);
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(CacheGateway::new(
        Arc::clone(&store) as Arc<dyn shipstore::DocumentStore>
    ));
    let planner = Arc::new(SearchPlanner::new(
        Arc::clone(&api) as Arc<dyn WarehouseApi>,
        config_with(stores),
    ));
    let resolver = Resolver::new(Arc::clone(&gateway), planner);
    World {
        resolver,
        gateway,
        api,
        store,
    }
}

/// Seed the cache with a record normalized from a vendor-shaped payload.
pub async fn seed(gateway: &CacheGateway, direction: Direction, store: &str, payload: Value) {
    let record = wmsfetcher::normalize::normalize_record(&payload, direction, store);
    gateway.save_record(&record).await.unwrap();
}

/// Read the stream to the end, splitting log lines from the terminal
/// resolution (if one arrived).
pub async fn drain(
    mut rx: UnboundedReceiver<ProgressEvent>,
) -> (Vec<String>, Option<Resolution>) {
    let mut logs = Vec::new();
    let mut done = None;
    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Log(line) => logs.push(line),
            ProgressEvent::Done(resolution) => done = Some(resolution),
        }
    }
    (logs, done)
}
