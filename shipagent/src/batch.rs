use std::collections::HashSet;

use shipstore::models::{DirectionFilter, Record};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::progress::{ProgressEvent, SearchRequest};
use crate::resolver::Resolver;

#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub terms: Vec<String>,
    pub store: Option<String>,
    pub direction: DirectionFilter,
    pub cancel: CancellationToken,
}

/// Consolidated outcome of a batch run. Results and related records are
/// deduplicated by identity, first occurrence winning; `not_found`
/// preserves the input order of terms that never resolved.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<Record>,
    pub related: Vec<Record>,
    pub not_found: Vec<String>,
    pub error: Option<String>,
}

impl Resolver {
    /// Run one resolution per term in the background, streaming all
    /// progress onto a single channel. Terms run strictly one after
    /// another so their log lines never interleave.
    pub fn resolve_many(
        &self,
        request: BatchRequest,
    ) -> (UnboundedReceiver<ProgressEvent>, JoinHandle<BatchReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let resolver = self.clone();
        let handle = tokio::spawn(async move { resolver.run_batch(request, &tx).await });
        (rx, handle)
    }

    async fn run_batch(
        &self,
        request: BatchRequest,
        tx: &UnboundedSender<ProgressEvent>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut seen = HashSet::new();
        let mut seen_related = HashSet::new();
        let total = request.terms.len();

        for (index, term) in request.terms.iter().enumerate() {
            if request.cancel.is_cancelled() {
                report.error = Some("Batch cancelled before completion".to_string());
                return report;
            }

            let _ = tx.send(ProgressEvent::Log(format!(
                "Searching ({}/{}): '{}'",
                index + 1,
                total,
                term
            )));

            let sub_request = SearchRequest {
                term: term.clone(),
                store: request.store.clone(),
                direction: request.direction,
                cancel: request.cancel.clone(),
            };
            let Some(resolution) = self.resolve_term(&sub_request, tx).await else {
                report.error = Some("Batch cancelled before completion".to_string());
                return report;
            };

            match resolution.record {
                Some(record) => {
                    if seen.insert(record.id.clone()) {
                        report.results.push(record);
                    }
                    if let Some(related) = resolution.related {
                        if seen_related.insert(related.id.clone()) {
                            report.related.push(related);
                        }
                    }
                }
                None => report.not_found.push(term.clone()),
            }
        }

        report
    }
}
