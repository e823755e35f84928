use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use shipstore::models::Direction;
use tokio_util::sync::CancellationToken;

use crate::config::StoreAccount;
use crate::error::{FetchError, Result};
use crate::window::DateWindow;

/// Header carrying the client-supplied order id on direct probes.
pub const CLIENT_ID_HEADER: &str = "X-Client-Id";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const BODY_EXCERPT_CHARS: usize = 120;

/// One authenticated call per method against one store's warehouse
/// service. The seam exists so orchestration code can run against scripted
/// implementations in tests.
///
/// A miss and a remote failure look identical to callers: both come back
/// as an empty result, with failures only logged. Cancellation is the one
/// distinct error.
#[async_trait]
pub trait WarehouseApi: Send + Sync {
    /// Direct-id probe: exact record for a client id, or nothing.
    async fn direct_probe(
        &self,
        store: &StoreAccount,
        direction: Direction,
        client_ref: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>>;

    /// Keyword search (or bulk list when `term` is `None`) constrained to
    /// a date window. Returns the first page of summaries.
    async fn search_window(
        &self,
        store: &StoreAccount,
        direction: Direction,
        term: Option<&str>,
        window: &DateWindow,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>>;

    /// Full record detail (including event history) by internal id.
    async fn fetch_detail(
        &self,
        store: &StoreAccount,
        direction: Direction,
        internal_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>>;
}

/// `reqwest`-backed [`WarehouseApi`]. One shared HTTP client; per-call
/// Basic auth from the store's key/secret pair.
pub struct HttpWarehouseClient {
    http: reqwest::Client,
    api_base: String,
}

impl HttpWarehouseClient {
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into(),
        })
    }

    async fn get_json(
        &self,
        store: &StoreAccount,
        url: String,
        headers: &[(&'static str, String)],
        query: &[(&'static str, String)],
        cancel: &CancellationToken,
    ) -> Result<Option<Value>> {
        let (Some(key), Some(secret)) = (&store.api_key, &store.api_secret) else {
            log::debug!("{}: no credentials configured, skipping {}", store.name, url);
            return Ok(None);
        };
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let mut request = self
            .http
            .get(&url)
            .basic_auth(key, Some(secret))
            .header("Accept", "application/json")
            .query(query);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            sent = request.send() => match sent {
                Ok(response) => response,
                Err(err) => {
                    log::warn!("{}: request to {} failed: {}", store.name, url, err);
                    return Ok(None);
                }
            },
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
            log::warn!("{}: {} returned HTTP {}: {}", store.name, url, status, excerpt);
            return Ok(None);
        }

        match response.json::<Value>().await {
            Ok(body) => Ok(Some(body)),
            Err(err) => {
                log::warn!("{}: invalid JSON from {}: {}", store.name, url, err);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl WarehouseApi for HttpWarehouseClient {
    async fn direct_probe(
        &self,
        store: &StoreAccount,
        direction: Direction,
        client_ref: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>> {
        // The probe endpoint ignores the path id and keys off the header.
        let url = format!("{}/{}/0", self.api_base, direction.plural());
        self.get_json(
            store,
            url,
            &[(CLIENT_ID_HEADER, client_ref.to_string())],
            &[],
            cancel,
        )
        .await
    }

    async fn search_window(
        &self,
        store: &StoreAccount,
        direction: Direction,
        term: Option<&str>,
        window: &DateWindow,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>> {
        let url = format!("{}/{}", self.api_base, direction.plural());
        let mut query = vec![
            ("startDate", window.start_param()),
            ("endDate", window.end_param()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(term) = term {
            query.push(("search", term.to_string()));
        }

        let body = self.get_json(store, url, &[], &query, cancel).await?;
        Ok(body
            .as_ref()
            .and_then(|body| body.get(direction.plural()))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_detail(
        &self,
        store: &StoreAccount,
        direction: Direction,
        internal_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>> {
        let url = format!("{}/{}/{}", self.api_base, direction.plural(), internal_id);
        self.get_json(store, url, &[], &[], cancel).await
    }
}
