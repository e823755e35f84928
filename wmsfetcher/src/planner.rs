use std::sync::Arc;

use serde_json::Value;
use shipstore::models::{Direction, DirectionFilter, Record};
use tokio_util::sync::CancellationToken;

use crate::client::WarehouseApi;
use crate::config::{FederationConfig, StoreAccount};
use crate::error::{FetchError, Result};
use crate::normalize::{normalize_record, scalar_string};
use crate::progress::ProgressReporter;
use crate::window::DateWindow;

/// Page size for keyword searches. Only the first result is consumed, but
/// the endpoint pages regardless.
pub const SEARCH_PAGE_SIZE: u32 = 100;

/// Ordered remote lookups for one escalation tier.
///
/// The planner is deliberately sequential: store order encodes a priority
/// heuristic and the first hit must stop all further calls, so nothing
/// here races. Remote call volume is exactly as large as needed to find
/// one match.
pub struct SearchPlanner {
    api: Arc<dyn WarehouseApi>,
    config: FederationConfig,
}

impl SearchPlanner {
    pub fn new(api: Arc<dyn WarehouseApi>, config: FederationConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// First record matching `term` across the ordered stores and
    /// directions within one date window, or nothing.
    pub async fn find_first(
        &self,
        term: &str,
        filter: DirectionFilter,
        store_filter: Option<&str>,
        window: &DateWindow,
        reporter: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Option<Record>> {
        let stores = self.ordered_stores(term, store_filter);
        if stores.is_empty() {
            if let Some(name) = store_filter {
                reporter.log(format!("No configured store matches '{name}'"));
            }
            return Ok(None);
        }

        for store in stores {
            for direction in filter.directions() {
                if cancel.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }
                if let Some(record) = self
                    .probe_store(store, *direction, term, window, reporter, cancel)
                    .await?
                {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    /// Stores to try, in order. A filter confines the search to one store;
    /// otherwise a store whose prefix matches the term's first character is
    /// moved to the front. The sort is stable, so the configured order of
    /// the remaining stores is preserved.
    fn ordered_stores(&self, term: &str, store_filter: Option<&str>) -> Vec<&StoreAccount> {
        if let Some(name) = store_filter {
            return self.config.store(name).into_iter().collect();
        }
        let lead = term.chars().next().map(|c| c.to_ascii_uppercase());
        let mut stores: Vec<&StoreAccount> = self.config.stores.iter().collect();
        stores.sort_by_key(|store| Some(store.prefix.to_ascii_uppercase()) != lead);
        stores
    }

    /// One store, one direction: direct-id probe, then keyword search with
    /// a follow-up detail fetch (list endpoints return summaries only).
    async fn probe_store(
        &self,
        store: &StoreAccount,
        direction: Direction,
        term: &str,
        window: &DateWindow,
        reporter: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Option<Record>> {
        reporter.log(format!(
            "{}: probing {} by client id '{}'",
            store.name,
            direction.plural(),
            term
        ));
        if let Some(raw) = self.api.direct_probe(store, direction, term, cancel).await? {
            reporter.log(format!("{}: direct probe matched '{}'", store.name, term));
            return Ok(self.accept(&raw, direction, store, reporter));
        }

        reporter.log(format!(
            "{}: no direct match, searching {} between {} and {}",
            store.name,
            direction.plural(),
            window.start_param(),
            window.end_param()
        ));
        let summaries = self
            .api
            .search_window(store, direction, Some(term), window, SEARCH_PAGE_SIZE, cancel)
            .await?;
        let Some(summary) = summaries.into_iter().next() else {
            reporter.log(format!(
                "{}: no {} match for '{}'",
                store.name,
                direction.plural(),
                term
            ));
            return Ok(None);
        };

        let internal_id = summary.get("id").map(scalar_string).unwrap_or_default();
        let raw = if internal_id.is_empty() {
            summary
        } else {
            reporter.log(format!(
                "{}: match found, fetching {} detail {}",
                store.name,
                direction.plural(),
                internal_id
            ));
            match self
                .api
                .fetch_detail(store, direction, &internal_id, cancel)
                .await?
            {
                Some(detail) => detail,
                // Summary still carries enough to resolve; never block a
                // record on a failed detail call.
                None => summary,
            }
        };
        Ok(self.accept(&raw, direction, store, reporter))
    }

    fn accept(
        &self,
        raw: &Value,
        direction: Direction,
        store: &StoreAccount,
        reporter: &dyn ProgressReporter,
    ) -> Option<Record> {
        let record = normalize_record(raw, direction, &store.name);
        if record.id.is_empty() {
            reporter.log(format!(
                "{}: discarding payload without a usable identity",
                store.name
            ));
            return None;
        }
        Some(record)
    }
}
