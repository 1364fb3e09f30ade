use document_traits::DocumentCollection;

use crate::{
    config::SeedingConfig,
    error::{SeedError, SeedResult},
};

/// Outcome of the seeding decision for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedCheck {
    pub needed: bool,
    /// Documents present in the collection at decision time.
    pub count: u64,
}

/// Combines the force policy with the live document count.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    database: String,
    config: SeedingConfig,
}

impl DecisionEngine {
    pub fn new(database: impl Into<String>, config: SeedingConfig) -> Self {
        Self {
            database: database.into(),
            config,
        }
    }

    pub fn database(&self) -> &str { &self.database }

    pub fn config(&self) -> &SeedingConfig { &self.config }

    /// The live count is always queried, even when the collection is
    /// already forced; a failing count aborts the run.
    pub async fn evaluate<C>(
        &self, handle: &C, collection: &str,
    ) -> SeedResult<SeedCheck>
    where
        C: DocumentCollection,
    {
        let forced = self.config.is_forced(&self.database, collection);
        let count = handle
            .count()
            .await
            .map_err(|err| SeedError::count(collection, err))?;
        Ok(SeedCheck {
            needed: forced || count == 0,
            count,
        })
    }
}
