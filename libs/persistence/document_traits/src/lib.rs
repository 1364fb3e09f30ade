pub mod collection;
pub mod database;

pub use collection::{DocumentCollection, IndexOptions, InsertResult};
pub use database::DocumentDatabase;

/// One record to be inserted: a mapping of field name to value.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Opaque index definition, passed through unchanged to the store.
pub type IndexSpec = serde_json::Value;
