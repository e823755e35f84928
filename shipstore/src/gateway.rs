use std::sync::Arc;

use chrono::Utc;

use crate::errors::Result;
use crate::models::{Direction, DirectionFilter, Record};
use crate::store::DocumentStore;

/// Indexed document fields probed after a direct id lookup, in order.
pub const LOOKUP_FIELDS: [&str; 4] = [
    "storeOrderId",
    "customerName",
    "trackingNumber",
    "channelId",
];

/// Write-through gateway onto the record collections.
///
/// The store is authoritative but never assumed fresh: resolution populates
/// it on remote hits and reads it first on every search. All writes are
/// merge-upserts keyed by record identity, so repeated persists of the same
/// record converge on a single document.
pub struct CacheGateway {
    store: Arc<dyn DocumentStore>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_record(&self, direction: Direction, id: &str) -> Result<Option<Record>> {
        match self.store.get(direction.collection(), id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn find_record(
        &self,
        direction: Direction,
        field: &str,
        value: &str,
    ) -> Result<Option<Record>> {
        match self
            .store
            .find_by_field(direction.collection(), field, value)
            .await?
        {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Cache-side search: the term as document id in each collection first,
    /// then each indexed field, Outbound collection before Inbound.
    pub async fn lookup(&self, term: &str, filter: DirectionFilter) -> Result<Option<Record>> {
        for direction in filter.directions() {
            if let Some(record) = self.get_record(*direction, term).await? {
                return Ok(Some(record));
            }
        }
        for direction in filter.directions() {
            for field in LOOKUP_FIELDS {
                if let Some(record) = self.find_record(*direction, field, term).await? {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    /// Merge-upsert the record into its direction collection, stamped with
    /// an update timestamp. Returns the stamped record.
    pub async fn save_record(&self, record: &Record) -> Result<Record> {
        let mut stamped = record.clone();
        stamped.updated_at = Some(Utc::now());
        let doc = serde_json::to_value(&stamped)?;
        self.store
            .upsert(stamped.direction.collection(), &stamped.id, doc, true)
            .await?;
        Ok(stamped)
    }

    pub async fn remove_record(&self, direction: Direction, id: &str) -> Result<()> {
        self.store.delete(direction.collection(), id).await
    }
}
