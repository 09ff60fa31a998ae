//! In-memory `DocumentStore` backing the server and the test suite.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::{BatchWrite, Document, DocumentStore, Filter, StoreError};

type Collection = BTreeMap<String, Document>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    channels: Arc<std::sync::Mutex<HashMap<String, broadcast::Sender<Vec<Document>>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, collection: &str) -> broadcast::Sender<Vec<Document>> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        channels
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(32).0)
            .clone()
    }

    fn publish(&self, collection: &str, docs: &Collection) {
        let snapshot: Vec<Document> = docs.values().cloned().collect();
        // Nobody listening is fine.
        let _ = self.sender(collection).send(snapshot);
    }
}

fn merge(target: &mut Document, partial: &Document) {
    for (key, value) in partial {
        target.insert(key.clone(), value.clone());
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .map(|c| {
                c.values()
                    .filter(|doc| filters.iter().all(|f| f.matches(doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn add(&self, collection: &str, mut data: Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        data.insert("id".into(), Value::String(id.clone()));

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        docs.insert(id.clone(), data);
        self.publish(collection, docs);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, mut data: Document) -> Result<(), StoreError> {
        data.insert("id".into(), Value::String(id.to_string()));

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        docs.insert(id.to_string(), data);
        self.publish(collection, docs);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let doc = docs.get_mut(id).ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
        merge(doc, &partial);
        self.publish(collection, docs);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.remove(id).is_none() {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        self.publish(collection, docs);
        Ok(())
    }

    async fn atomic_batch(&self, writes: Vec<BatchWrite>) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;

        // Validate every target before applying anything, so a bad write
        // cannot leave the batch half-committed.
        for write in &writes {
            let exists = collections
                .get(&write.collection)
                .map(|c| c.contains_key(&write.id))
                .unwrap_or(false);
            if !exists {
                return Err(StoreError::NotFound {
                    collection: write.collection.clone(),
                    id: write.id.clone(),
                });
            }
        }

        let mut touched: Vec<String> = Vec::new();
        for write in &writes {
            if let Some(doc) = collections
                .get_mut(&write.collection)
                .and_then(|c| c.get_mut(&write.id))
            {
                merge(doc, &write.data);
            }
            if !touched.contains(&write.collection) {
                touched.push(write.collection.clone());
            }
        }

        for collection in touched {
            if let Some(docs) = collections.get(&collection) {
                self.publish(&collection, docs);
            }
        }
        Ok(())
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<Vec<Document>> {
        self.sender(collection).subscribe()
    }
}
