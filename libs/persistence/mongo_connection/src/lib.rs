pub use config::MongoDbConfig;
pub use document_traits;
pub use impl_get_collection::{MongoCollection, MongoConnect, MongoStoreError};
pub use mongodb;

pub mod config;
mod impl_get_collection;

pub use impl_get_collection::connect_mongo_db;
