use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;

/// Narrow interface onto the document store backing the local cache.
///
/// Two logical collections are used by the gateway, one per direction.
/// `find_by_field` returns the first document whose top-level `field`
/// equals `value`; callers rely on at most one match being relevant.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>>;

    /// Insert or replace a document. With `merge` set, top-level fields of
    /// `document` are overlaid onto the existing document instead of
    /// replacing it wholesale.
    async fn upsert(&self, collection: &str, id: &str, document: Value, merge: bool)
        -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Shallow top-level merge. Non-object inputs fall back to replacement.
pub fn merge_documents(base: &mut Value, patch: &Value) {
    match (base.as_object_mut(), patch.as_object()) {
        (Some(base_map), Some(patch_map)) => {
            for (key, value) in patch_map {
                base_map.insert(key.clone(), value.clone());
            }
        }
        _ => *base = patch.clone(),
    }
}

fn field_equals(document: &Value, field: &str, value: &str) -> bool {
    match document.get(field) {
        Some(Value::String(s)) => s == value,
        Some(Value::Number(n)) => n.to_string() == value,
        _ => false,
    }
}

/// In-memory store, primarily for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(collection).and_then(|docs| {
            docs.values()
                .find(|doc| field_equals(doc, field, value))
                .cloned()
        }))
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        document: Value,
        merge: bool,
    ) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        if merge {
            if let Some(existing) = docs.get_mut(id) {
                merge_documents(existing, &document);
                return Ok(());
            }
        }
        docs.insert(id.to_string(), document);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn merge_upsert_overlays_fields() {
        let store = MemoryStore::new();
        store
            .upsert("outbound-records", "A1", json!({"id": "A1", "status": "Packed"}), true)
            .await
            .unwrap();
        store
            .upsert("outbound-records", "A1", json!({"id": "A1", "status": "Shipped"}), true)
            .await
            .unwrap();

        assert_eq!(store.document_count("outbound-records"), 1);
        let doc = store.get("outbound-records", "A1").await.unwrap().unwrap();
        assert_eq!(doc["status"], "Shipped");
    }

    #[tokio::test]
    async fn merge_keeps_fields_absent_from_patch() {
        let store = MemoryStore::new();
        store
            .upsert("outbound-records", "A1", json!({"id": "A1", "courier": "DPD"}), true)
            .await
            .unwrap();
        store
            .upsert("outbound-records", "A1", json!({"id": "A1", "status": "Shipped"}), true)
            .await
            .unwrap();

        let doc = store.get("outbound-records", "A1").await.unwrap().unwrap();
        assert_eq!(doc["courier"], "DPD");
        assert_eq!(doc["status"], "Shipped");
    }

    #[tokio::test]
    async fn find_by_field_matches_numbers_as_text() {
        let store = MemoryStore::new();
        store
            .upsert("inbound-records", "R1", json!({"id": "R1", "channelId": 4412}), false)
            .await
            .unwrap();

        let found = store
            .find_by_field("inbound-records", "channelId", "4412")
            .await
            .unwrap();
        assert!(found.is_some());
        assert!(store
            .find_by_field("inbound-records", "channelId", "9999")
            .await
            .unwrap()
            .is_none());
    }
}
