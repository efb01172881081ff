// src/db/memory_store.rs

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::store::{json_contains, Collection, DocumentStore};

/// Process-local store used by the test suite and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<(Uuid, Value)>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: Collection, id: Uuid, body: Value) -> Result<(), AppError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if docs.iter().any(|(existing, _)| *existing == id) {
            return Err(anyhow::anyhow!("duplicate id {} in {}", id, collection).into());
        }
        docs.push((id, body));
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|(existing, _)| *existing == id))
            .map(|(_, body)| body.clone()))
    }

    async fn find(&self, collection: Collection, filter: &Value) -> Result<Vec<Value>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, body)| json_contains(body, filter))
                    .map(|(_, body)| body.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace(&self, collection: Collection, id: Uuid, body: Value) -> Result<bool, AppError> {
        let mut collections = self.collections.write().await;
        let slot = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|(existing, _)| *existing == id));

        match slot {
            Some((_, existing)) => {
                *existing = body;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, AppError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|(existing, _)| *existing != id);
        Ok(docs.len() != before)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
