use thiserror::Error;

use crate::preprocess::PreprocessError;

type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal seeding failures. Everything here aborts the run at the point of
/// failure; preprocess warnings and index-creation failures are logged
/// instead and never surface as a `SeedError`.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to count documents in collection {collection}")]
    Count {
        collection: String,
        #[source]
        source: Source,
    },

    #[error("failed to reset collection {collection}")]
    Reset {
        collection: String,
        #[source]
        source: Source,
    },

    #[error("failed to load seed source for collection {collection}")]
    Load {
        collection: String,
        #[source]
        source: Source,
    },

    #[error("no seed source registered under `{name}` for collection {collection}")]
    UnknownSource { collection: String, name: String },

    #[error("failed to preprocess documents for collection {collection}")]
    Preprocess {
        collection: String,
        #[source]
        source: PreprocessError,
    },

    #[error("failed to insert {count} document(s) into collection {collection}")]
    Insert {
        collection: String,
        count: usize,
        #[source]
        source: Source,
    },
}

impl SeedError {
    pub(crate) fn count(collection: &str, source: impl Into<Source>) -> Self {
        Self::Count {
            collection: collection.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn reset(collection: &str, source: impl Into<Source>) -> Self {
        Self::Reset {
            collection: collection.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn load(collection: &str, source: anyhow::Error) -> Self {
        Self::Load {
            collection: collection.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn insert(
        collection: &str, count: usize, source: impl Into<Source>,
    ) -> Self {
        Self::Insert {
            collection: collection.to_string(),
            count,
            source: source.into(),
        }
    }

    /// Collection whose pipeline failed.
    pub fn collection(&self) -> &str {
        match self {
            Self::Count { collection, .. }
            | Self::Reset { collection, .. }
            | Self::Load { collection, .. }
            | Self::UnknownSource { collection, .. }
            | Self::Preprocess { collection, .. }
            | Self::Insert { collection, .. } => collection,
        }
    }
}

pub type SeedResult<T> = Result<T, SeedError>;
