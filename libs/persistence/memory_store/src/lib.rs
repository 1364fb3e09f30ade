//! In-memory document store, used as the test backing store and for
//! dry-run seeding without a live database.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use document_traits::{
    Document, DocumentCollection, DocumentDatabase, IndexOptions, IndexSpec,
    InsertResult,
};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("only the empty filter is supported, got {0}")]
    UnsupportedFilter(serde_json::Value),
    #[error("index spec must be a non-empty object, got {0}")]
    InvalidIndexSpec(IndexSpec),
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, Vec<Document>>,
    indexes: HashMap<String, Vec<IndexSpec>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryDatabase {
    pub fn new() -> Self { Self::default() }

    /// Direct insert bypassing the collection handle, for test setup.
    pub async fn insert_raw(&self, collection: &str, documents: Vec<Document>) {
        let mut inner = self.inner.write().await;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        let inner = self.inner.read().await;
        inner.collections.get(collection).cloned().unwrap_or_default()
    }

    pub async fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        let inner = self.inner.read().await;
        inner.indexes.get(collection).cloned().unwrap_or_default()
    }
}

impl DocumentDatabase for MemoryDatabase {
    type Collection = MemoryCollection;

    fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection {
            name: name.to_string(),
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryCollection {
    name: String,
    inner: Arc<RwLock<Inner>>,
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    type Error = MemoryStoreError;

    async fn count(&self) -> Result<u64, MemoryStoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(&self.name)
            .map_or(0, |documents| documents.len() as u64))
    }

    async fn delete_many(
        &self, filter: &serde_json::Value,
    ) -> Result<u64, MemoryStoreError> {
        match filter.as_object() {
            Some(fields) if fields.is_empty() => {}
            _ => {
                return Err(MemoryStoreError::UnsupportedFilter(
                    filter.clone(),
                ));
            }
        }
        let mut inner = self.inner.write().await;
        Ok(inner
            .collections
            .remove(&self.name)
            .map_or(0, |documents| documents.len() as u64))
    }

    async fn insert_many(
        &self, documents: Vec<Document>,
    ) -> Result<InsertResult, MemoryStoreError> {
        let mut inner = self.inner.write().await;
        let slot = inner.collections.entry(self.name.clone()).or_default();
        let inserted_count = documents.len() as u64;
        slot.extend(documents);
        Ok(InsertResult { inserted_count })
    }

    async fn ensure_index(
        &self, spec: &IndexSpec, _options: IndexOptions,
    ) -> Result<(), MemoryStoreError> {
        match spec.as_object() {
            Some(keys) if !keys.is_empty() => {}
            _ => return Err(MemoryStoreError::InvalidIndexSpec(spec.clone())),
        }
        let mut inner = self.inner.write().await;
        inner
            .indexes
            .entry(self.name.clone())
            .or_default()
            .push(spec.clone());
        Ok(())
    }
}
