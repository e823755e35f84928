use std::sync::Arc;

use shipstore::models::{Direction, DirectionFilter, Record};
use shipstore::CacheGateway;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use wmsfetcher::{DateWindow, FetchError, SearchPlanner, RECENT_WINDOW_DAYS};

use crate::progress::{ChannelReporter, ProgressEvent, Resolution, SearchRequest};

/// Marker prefixed to the digits of an outbound identity to derive the
/// linked return's id.
pub const RETURN_ID_PREFIX: &str = "RET-";

/// Candidate return id for an outbound record: non-digits stripped from
/// the primary identity, fixed prefix applied.
pub fn derive_return_id(primary_id: &str) -> String {
    let digits: String = primary_id
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    format!("{RETURN_ID_PREFIX}{digits}")
}

fn emit(tx: &UnboundedSender<ProgressEvent>, message: String) {
    let _ = tx.send(ProgressEvent::Log(message));
}

/// The resolution state machine: local lookup, then progressively wider
/// remote tiers, then related-record linking, then cache population.
///
/// Every run streams its progress onto one channel and finishes with
/// exactly one `Done` event, unless cancelled, in which case the channel
/// simply closes. Cancellation is polled before every remote call.
///
/// Cloning is cheap: both halves are shared handles.
#[derive(Clone)]
pub struct Resolver {
    gateway: Arc<CacheGateway>,
    planner: Arc<SearchPlanner>,
}

impl Resolver {
    pub fn new(gateway: Arc<CacheGateway>, planner: Arc<SearchPlanner>) -> Self {
        Self { gateway, planner }
    }

    /// Run one resolution in the background and stream its events.
    pub fn resolve(&self, request: SearchRequest) -> UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let resolver = self.clone();
        tokio::spawn(async move {
            if let Some(resolution) = resolver.resolve_term(&request, &tx).await {
                let _ = tx.send(ProgressEvent::Done(resolution));
            }
            // Dropping tx closes the stream; no Done means cancelled.
        });
        rx
    }

    /// The state machine proper. Returns `None` when cancelled, in which
    /// case no terminal event may be emitted.
    pub(crate) async fn resolve_term(
        &self,
        request: &SearchRequest,
        tx: &UnboundedSender<ProgressEvent>,
    ) -> Option<Resolution> {
        if request.cancel.is_cancelled() {
            return None;
        }

        emit(tx, format!("Checking local cache for '{}'", request.term));
        match self.gateway.lookup(&request.term, request.direction).await {
            Ok(Some(record)) => {
                emit(
                    tx,
                    format!("Found {} '{}' in local cache", record.direction, record.id),
                );
                let related = self.resolve_related(&record, tx, &request.cancel).await?;
                return Some(Resolution {
                    record: Some(record),
                    related,
                    error: None,
                });
            }
            Ok(None) => emit(tx, "Local cache miss".to_string()),
            // A broken local store is fatal for this resolution, not a miss.
            Err(err) => {
                let message = format!("Local cache lookup failed: {err}");
                emit(tx, message.clone());
                return Some(Resolution {
                    record: None,
                    related: None,
                    error: Some(message),
                });
            }
        }

        let found = match self
            .remote_search(
                &request.term,
                request.direction,
                request.store.as_deref(),
                tx,
                &request.cancel,
            )
            .await
        {
            Ok(found) => found,
            Err(FetchError::Cancelled) => return None,
            Err(err) => {
                emit(tx, format!("Remote search failed: {err}"));
                None
            }
        };

        let Some(record) = found else {
            let message = format!(
                "No record matched '{}' in the local cache or any warehouse service",
                request.term
            );
            emit(tx, message.clone());
            return Some(Resolution {
                record: None,
                related: None,
                error: Some(message),
            });
        };

        let record = self.persist(record, tx).await;
        let related = self.resolve_related(&record, tx, &request.cancel).await?;
        Some(Resolution {
            record: Some(record),
            related,
            error: None,
        })
    }

    /// Recent tier first, then the wide historical tier. The historical
    /// tier runs exactly when the recent tier misses.
    async fn remote_search(
        &self,
        term: &str,
        filter: DirectionFilter,
        store: Option<&str>,
        tx: &UnboundedSender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> wmsfetcher::Result<Option<Record>> {
        let reporter = ChannelReporter::new(tx.clone());

        emit(
            tx,
            format!("Searching warehouse services (last {RECENT_WINDOW_DAYS} days)"),
        );
        if let Some(record) = self
            .planner
            .find_first(term, filter, store, &DateWindow::recent(), &reporter, cancel)
            .await?
        {
            return Ok(Some(record));
        }

        emit(tx, "No recent match, widening to full history".to_string());
        self.planner
            .find_first(
                term,
                filter,
                store,
                &DateWindow::historical(),
                &reporter,
                cancel,
            )
            .await
    }

    /// Write-through of a remote match. Persist failures degrade to a log
    /// line; the resolution still completes with the in-memory record.
    async fn persist(&self, record: Record, tx: &UnboundedSender<ProgressEvent>) -> Record {
        match self.gateway.save_record(&record).await {
            Ok(stamped) => {
                emit(
                    tx,
                    format!("Cached {} '{}'", stamped.direction, stamped.id),
                );
                stamped
            }
            Err(err) => {
                emit(tx, format!("Failed to cache '{}': {err}", record.id));
                record
            }
        }
    }

    /// Outbound primaries only: derive the return id and look for it,
    /// local cache first, then both remote tiers restricted to Inbound
    /// with no store filter. Returns `None` when cancelled.
    async fn resolve_related(
        &self,
        primary: &Record,
        tx: &UnboundedSender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> Option<Option<Record>> {
        if primary.direction != Direction::Outbound {
            return Some(None);
        }

        let return_id = derive_return_id(&primary.id);
        emit(tx, format!("Looking for linked return '{return_id}'"));
        match self.gateway.lookup(&return_id, DirectionFilter::Inbound).await {
            Ok(Some(related)) => {
                emit(tx, format!("Found return '{}' in local cache", related.id));
                return Some(Some(related));
            }
            Ok(None) => {}
            Err(err) => {
                emit(tx, format!("Return lookup failed, skipping link: {err}"));
                return Some(None);
            }
        }

        if cancel.is_cancelled() {
            return None;
        }
        let found = match self
            .remote_search(&return_id, DirectionFilter::Inbound, None, tx, cancel)
            .await
        {
            Ok(found) => found,
            Err(FetchError::Cancelled) => return None,
            Err(err) => {
                emit(tx, format!("Return search failed, skipping link: {err}"));
                None
            }
        };

        match found {
            Some(related) => {
                let related = self.persist(related, tx).await;
                Some(Some(related))
            }
            None => {
                emit(tx, format!("No return found for '{}'", primary.id));
                Some(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_id_strips_non_digits_and_prefixes() {
        assert_eq!(derive_return_id("SHP-10000534785"), "RET-10000534785");
        assert_eq!(derive_return_id("J16530"), "RET-16530");
        assert_eq!(derive_return_id("no-digits"), "RET-");
    }
}
