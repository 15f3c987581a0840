use std::collections::HashMap;

use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, Fields, StoreError};

/// Length of Firestore's auto-generated document ids.
const ID_LEN: usize = 20;

/// Process-local store for development and tests. Nothing survives a
/// restart. Lists come back in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

fn generate_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn probe(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn write(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        let id = loop {
            let candidate = generate_id();
            if !documents.iter().any(|d| d.id == candidate) {
                break candidate;
            }
        };

        documents.push(Document {
            id: id.clone(),
            fields,
        });
        Ok(id)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }
}
