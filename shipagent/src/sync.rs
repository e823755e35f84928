use std::sync::Arc;

use futures::stream::{self, StreamExt};
use shipstore::models::Direction;
use shipstore::CacheGateway;
use tokio_util::sync::CancellationToken;
use wmsfetcher::normalize::normalize_record;
use wmsfetcher::{DateWindow, FederationConfig, StoreAccount, WarehouseApi};

/// Page size for bulk pulls. Large on purpose: reconciliation is
/// exhaustive, not escalating.
pub const BULK_PAGE_SIZE: u32 = 500;

const UNIT_CONCURRENCY: usize = 4;
const UPSERT_CONCURRENCY: usize = 8;

#[derive(Debug)]
pub struct SyncReport {
    pub success: bool,
    pub records_created: usize,
    pub records_updated: usize,
    pub errors: Vec<String>,
    pub message: String,
}

#[derive(Default)]
struct UnitStats {
    created: usize,
    updated: usize,
    errors: Vec<String>,
}

/// Direction-aware bulk pull from every credentialed store for one date
/// window. Store × direction units run concurrently; they write disjoint
/// identities, so merge-upserts need no coordination. One unit's failure
/// never blocks the others.
pub struct SyncReconciler {
    api: Arc<dyn WarehouseApi>,
    gateway: Arc<CacheGateway>,
    config: FederationConfig,
}

impl SyncReconciler {
    pub fn new(
        api: Arc<dyn WarehouseApi>,
        gateway: Arc<CacheGateway>,
        config: FederationConfig,
    ) -> Self {
        Self {
            api,
            gateway,
            config,
        }
    }

    pub async fn run(&self, window: &DateWindow, cancel: &CancellationToken) -> SyncReport {
        let units: Vec<(&StoreAccount, Direction)> = self
            .config
            .stores
            .iter()
            .filter(|store| store.has_credentials())
            .flat_map(|store| [(store, Direction::Outbound), (store, Direction::Inbound)])
            .collect();

        if units.is_empty() {
            return SyncReport {
                success: true,
                records_created: 0,
                records_updated: 0,
                errors: Vec::new(),
                message: "No stores with usable credentials configured".to_string(),
            };
        }

        let outcomes: Vec<UnitStats> = stream::iter(units)
            .map(|(store, direction)| self.sync_unit(store, direction, window, cancel))
            .buffer_unordered(UNIT_CONCURRENCY)
            .collect()
            .await;

        let mut created = 0;
        let mut updated = 0;
        let mut errors = Vec::new();
        for stats in outcomes {
            created += stats.created;
            updated += stats.updated;
            errors.extend(stats.errors);
        }

        let cancelled = cancel.is_cancelled();
        let message = if cancelled {
            format!("Sync cancelled after {created} created, {updated} updated")
        } else {
            format!(
                "Sync complete: {created} created, {updated} updated, {} error(s)",
                errors.len()
            )
        };
        SyncReport {
            success: !cancelled,
            records_created: created,
            records_updated: updated,
            errors,
            message,
        }
    }

    async fn sync_unit(
        &self,
        store: &StoreAccount,
        direction: Direction,
        window: &DateWindow,
        cancel: &CancellationToken,
    ) -> UnitStats {
        let label = format!("{}/{}", store.name, direction.plural());
        if cancel.is_cancelled() {
            return UnitStats {
                errors: vec![format!("{label}: cancelled")],
                ..UnitStats::default()
            };
        }

        let payloads = match self
            .api
            .search_window(store, direction, None, window, BULK_PAGE_SIZE, cancel)
            .await
        {
            Ok(payloads) => payloads,
            Err(err) => {
                return UnitStats {
                    errors: vec![format!("{label}: {err}")],
                    ..UnitStats::default()
                };
            }
        };
        tracing::debug!("{label}: {} record(s) in window", payloads.len());

        let outcomes: Vec<Result<bool, String>> = stream::iter(payloads)
            .map(|payload| {
                let label = label.clone();
                async move {
                    let record = normalize_record(&payload, direction, &store.name);
                    if record.id.is_empty() {
                        return Err(format!("{label}: payload without a usable identity"));
                    }
                    let existed = self
                        .gateway
                        .get_record(direction, &record.id)
                        .await
                        .map_err(|err| format!("{label}: {}: {err}", record.id))?
                        .is_some();
                    self.gateway
                        .save_record(&record)
                        .await
                        .map_err(|err| format!("{label}: {}: {err}", record.id))?;
                    Ok(existed)
                }
            })
            .buffer_unordered(UPSERT_CONCURRENCY)
            .collect()
            .await;

        let mut stats = UnitStats::default();
        for outcome in outcomes {
            match outcome {
                Ok(true) => stats.updated += 1,
                Ok(false) => stats.created += 1,
                Err(err) => stats.errors.push(err),
            }
        }
        stats
    }
}
