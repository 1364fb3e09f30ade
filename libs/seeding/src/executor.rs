use document_traits::{
    DocumentCollection, DocumentDatabase, IndexOptions, IndexSpec,
};
use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::SeedingConfig,
    context::SeedContext,
    decision::{DecisionEngine, SeedCheck},
    error::{SeedError, SeedResult},
    preprocess::Preprocessor,
    spec::{SeedSource, SeedSpec, SourceRegistry},
};

/// Terminal state of one collection's pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionOutcome {
    Skipped {
        count: u64,
    },
    Seeded {
        inserted: u64,
    },
    SeededWithIndexWarnings {
        inserted: u64,
        failed_indexes: Vec<IndexSpec>,
    },
}

/// Per-collection outcomes of a seeding run, in spec order.
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    outcomes: Vec<(String, CollectionOutcome)>,
}

impl SeedReport {
    fn record(&mut self, collection: &str, outcome: CollectionOutcome) {
        self.outcomes.push((collection.to_string(), outcome));
    }

    pub fn outcomes(&self) -> &[(String, CollectionOutcome)] {
        &self.outcomes
    }

    pub fn outcome(&self, collection: &str) -> Option<&CollectionOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == collection)
            .map(|(_, outcome)| outcome)
    }

    pub fn seeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| {
                !matches!(outcome, CollectionOutcome::Skipped { .. })
            })
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.seeded()
    }

    pub fn inserted(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                CollectionOutcome::Skipped { .. } => 0,
                CollectionOutcome::Seeded { inserted }
                | CollectionOutcome::SeededWithIndexWarnings {
                    inserted, ..
                } => *inserted,
            })
            .sum()
    }

    pub fn has_index_warnings(&self) -> bool {
        self.outcomes.iter().any(|(_, outcome)| {
            matches!(
                outcome,
                CollectionOutcome::SeededWithIndexWarnings { .. }
            )
        })
    }
}

/// Drives the per-collection pipeline: decide, reset, load, preprocess,
/// insert, index. Collections run strictly one at a time in spec order;
/// the first fatal error aborts the run and leaves earlier collections
/// seeded.
pub struct DataSeeder<D> {
    db: D,
    decision: DecisionEngine,
    spec: SeedSpec,
    registry: SourceRegistry,
    preprocessor: Preprocessor,
}

impl<D> DataSeeder<D>
where
    D: DocumentDatabase,
{
    pub fn new(
        db: D, database: impl Into<String>, spec: SeedSpec,
        config: SeedingConfig,
    ) -> Self {
        Self {
            db,
            decision: DecisionEngine::new(database, config),
            spec,
            registry: SourceRegistry::new(),
            preprocessor: Preprocessor::standard(),
        }
    }

    pub fn with_registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn database(&self) -> &str { self.decision.database() }

    pub fn spec(&self) -> &SeedSpec { &self.spec }

    /// Decision for a single collection, without seeding it.
    pub async fn seed_needed(&self, collection: &str) -> SeedResult<SeedCheck> {
        let handle = self.db.collection(collection);
        self.decision.evaluate(&handle, collection).await
    }

    #[instrument(skip(self, ctx), fields(database = %self.decision.database()))]
    pub async fn seed(&self, ctx: &SeedContext) -> SeedResult<SeedReport> {
        info!(
            "seeding {} collection(s) in database {}",
            self.spec.len(),
            self.decision.database()
        );

        let mut report = SeedReport::default();
        for (collection, source) in self.spec.iter() {
            let outcome = self.seed_collection(collection, source, ctx).await?;
            report.record(collection, outcome);
        }

        info!(
            "seeding finished for database {}: {} seeded, {} skipped, {} document(s) inserted",
            self.decision.database(),
            report.seeded(),
            report.skipped(),
            report.inserted()
        );
        Ok(report)
    }

    async fn seed_collection(
        &self, collection: &str, source: &SeedSource, ctx: &SeedContext,
    ) -> SeedResult<CollectionOutcome> {
        let handle = self.db.collection(collection);

        let check = self.decision.evaluate(&handle, collection).await?;
        if !check.needed {
            debug!(
                "seeding not needed for collection {}:{}",
                self.decision.database(),
                collection
            );
            return Ok(CollectionOutcome::Skipped { count: check.count });
        }

        debug!(
            "seeding data for collection {}:{}",
            self.decision.database(),
            collection
        );

        // Reset is all-or-nothing; an already empty collection is left
        // untouched.
        if check.count > 0 {
            handle
                .delete_many(&json!({}))
                .await
                .map_err(|err| SeedError::reset(collection, err))?;
        }

        let resolved =
            source.resolve(collection, &self.registry, ctx).await?;
        let documents =
            self.preprocessor.process(resolved.data).await.map_err(
                |source| SeedError::Preprocess {
                    collection: collection.to_string(),
                    source,
                },
            )?;

        let batch_size = documents.len();
        let result = handle
            .insert_many(documents)
            .await
            .map_err(|err| SeedError::insert(collection, batch_size, err))?;
        debug!(
            "{} document(s) inserted in collection {}:{}",
            result.inserted_count,
            self.decision.database(),
            collection
        );

        if resolved.indexes.is_empty() {
            return Ok(CollectionOutcome::Seeded {
                inserted: result.inserted_count,
            });
        }

        let failed_indexes = self
            .create_indexes(&handle, collection, &resolved.indexes)
            .await;
        if failed_indexes.is_empty() {
            Ok(CollectionOutcome::Seeded {
                inserted: result.inserted_count,
            })
        }
        else {
            Ok(CollectionOutcome::SeededWithIndexWarnings {
                inserted: result.inserted_count,
                failed_indexes,
            })
        }
    }

    /// Index builds run concurrently once the insert has completed; each
    /// failure is logged and recorded, never propagated.
    async fn create_indexes(
        &self, handle: &D::Collection, collection: &str, indexes: &[IndexSpec],
    ) -> Vec<IndexSpec> {
        let attempts = indexes.iter().map(|spec| async move {
            match handle.ensure_index(spec, IndexOptions::background()).await {
                Ok(()) => None,
                Err(err) => {
                    warn!(
                        "unable to create index {spec} on {collection}: {err}"
                    );
                    Some(spec.clone())
                }
            }
        });
        join_all(attempts).await.into_iter().flatten().collect()
    }
}
