use async_trait::async_trait;
use document_traits::{
    Document, DocumentCollection, DocumentDatabase, IndexOptions, IndexSpec,
    InsertResult,
};
use mongodb::{
    Client, IndexModel,
    bson::{self, Document as BsonDocument, doc},
    options::{ClientOptions, IndexOptions as MongoIndexOptions},
};
use thiserror::Error;
use tracing::debug;

use crate::config::MongoDbConfig;

#[derive(Debug, Error)]
pub enum MongoStoreError {
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
    #[error("failed to convert value to BSON")]
    Conversion(#[from] bson::ser::Error),
}

pub async fn connect_mongo_db(
    config: &MongoDbConfig,
) -> Result<MongoConnect, MongoStoreError> {
    let mut options = ClientOptions::parse(&config.uri).await?;
    options.app_name = config.app_name.clone();
    let client = Client::with_options(options)?;
    debug!("connected to {} database {}", config.uri, config.database);
    Ok(MongoConnect {
        db: client.database(&config.database),
    })
}

#[derive(Debug, Clone)]
pub struct MongoConnect {
    db: mongodb::Database,
}

impl MongoConnect {
    pub fn new(db: mongodb::Database) -> Self { Self { db } }

    pub fn database(&self) -> &mongodb::Database { &self.db }
}

impl DocumentDatabase for MongoConnect {
    type Collection = MongoCollection;

    fn collection(&self, name: &str) -> MongoCollection {
        MongoCollection {
            inner: self.db.collection::<BsonDocument>(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MongoCollection {
    inner: mongodb::Collection<BsonDocument>,
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    type Error = MongoStoreError;

    async fn count(&self) -> Result<u64, MongoStoreError> {
        Ok(self.inner.count_documents(doc! {}).await?)
    }

    async fn delete_many(
        &self, filter: &serde_json::Value,
    ) -> Result<u64, MongoStoreError> {
        let filter = bson::to_document(filter)?;
        let result = self.inner.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn insert_many(
        &self, documents: Vec<Document>,
    ) -> Result<InsertResult, MongoStoreError> {
        // The driver rejects an empty batch.
        if documents.is_empty() {
            return Ok(InsertResult { inserted_count: 0 });
        }
        let documents = documents
            .iter()
            .map(bson::to_document)
            .collect::<Result<Vec<_>, _>>()?;
        let result = self.inner.insert_many(documents).await?;
        Ok(InsertResult {
            inserted_count: result.inserted_ids.len() as u64,
        })
    }

    async fn ensure_index(
        &self, spec: &IndexSpec, options: IndexOptions,
    ) -> Result<(), MongoStoreError> {
        let keys = bson::to_document(spec)?;
        let index_options = MongoIndexOptions::builder()
            .background(options.background)
            .build();
        let model = IndexModel::builder()
            .keys(keys)
            .options(index_options)
            .build();
        self.inner.create_index(model).await?;
        Ok(())
    }
}
