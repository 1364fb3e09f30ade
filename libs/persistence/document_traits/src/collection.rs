use std::error::Error as StdError;

use async_trait::async_trait;

use crate::{Document, IndexSpec};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub background: bool,
}

impl IndexOptions {
    /// Non-blocking index build.
    pub fn background() -> Self { Self { background: true } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertResult {
    pub inserted_count: u64,
}

#[async_trait]
pub trait DocumentCollection: Send + Sync {
    type Error: StdError + Send + Sync + 'static;

    async fn count(&self) -> Result<u64, Self::Error>;

    async fn delete_many(
        &self, filter: &serde_json::Value,
    ) -> Result<u64, Self::Error>;

    async fn insert_many(
        &self, documents: Vec<Document>,
    ) -> Result<InsertResult, Self::Error>;

    async fn ensure_index(
        &self, spec: &IndexSpec, options: IndexOptions,
    ) -> Result<(), Self::Error>;
}
