use std::{collections::HashMap, fmt, sync::Arc};

use anyhow::{Context, bail};
use async_trait::async_trait;
use document_traits::{Document, IndexSpec};

use crate::{
    context::SeedContext,
    error::{SeedError, SeedResult},
};

/// Produces seed documents for one collection. Providers back registered
/// source names and inline factories; they receive the runtime context and
/// are re-invoked on every run (no caching).
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn provide(
        &self, ctx: &SeedContext,
    ) -> anyhow::Result<ResolvedSource>;
}

/// Loader output normal form: documents plus any declared indexes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSource {
    pub data: Vec<Document>,
    pub indexes: Vec<IndexSpec>,
}

impl From<Vec<Document>> for ResolvedSource {
    fn from(data: Vec<Document>) -> Self {
        Self {
            data,
            indexes: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub enum SeedSource {
    /// Inline ordered documents.
    Inline(Vec<Document>),
    /// Inline documents plus index declarations.
    Dataset {
        data: Vec<Document>,
        indexes: Vec<IndexSpec>,
    },
    /// Reference to a provider registered under this name.
    Registered(String),
    /// Provider supplied directly in the spec.
    Factory(Arc<dyn SourceProvider>),
}

impl fmt::Debug for SeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(data) => {
                f.debug_tuple("Inline").field(&data.len()).finish()
            }
            Self::Dataset { data, indexes } => f
                .debug_struct("Dataset")
                .field("data", &data.len())
                .field("indexes", &indexes.len())
                .finish(),
            Self::Registered(name) => {
                f.debug_tuple("Registered").field(name).finish()
            }
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

impl SeedSource {
    /// Builds a source from its JSON spec-file shape: an array of
    /// documents, a `{data, indexes}` object, or a registered-source name.
    pub fn from_value(value: serde_json::Value) -> anyhow::Result<Self> {
        match value {
            serde_json::Value::String(name) => Ok(Self::Registered(name)),
            serde_json::Value::Array(items) => {
                Ok(Self::Inline(documents_from(items)?))
            }
            serde_json::Value::Object(mut fields) => {
                let data = match fields.remove("data") {
                    Some(serde_json::Value::Array(items)) => {
                        documents_from(items)?
                    }
                    Some(other) => {
                        bail!("`data` must be an array of documents, got {other}")
                    }
                    None => bail!("seed object is missing a `data` array"),
                };
                let indexes = match fields.remove("indexes") {
                    Some(serde_json::Value::Array(items)) => items,
                    Some(other) => {
                        bail!("`indexes` must be an array, got {other}")
                    }
                    None => Vec::new(),
                };
                Ok(Self::Dataset { data, indexes })
            }
            other => bail!("unsupported seed source shape: {other}"),
        }
    }

    /// Document Loader: resolves this entry to documents and indexes. Inline
    /// shapes pass through; registered names and factories are invoked with
    /// the runtime context.
    pub(crate) async fn resolve(
        &self, collection: &str, registry: &SourceRegistry, ctx: &SeedContext,
    ) -> SeedResult<ResolvedSource> {
        match self {
            Self::Inline(data) => Ok(data.clone().into()),
            Self::Dataset { data, indexes } => Ok(ResolvedSource {
                data: data.clone(),
                indexes: indexes.clone(),
            }),
            Self::Registered(name) => {
                let provider = registry.get(name).ok_or_else(|| {
                    SeedError::UnknownSource {
                        collection: collection.to_string(),
                        name: name.clone(),
                    }
                })?;
                provider
                    .provide(ctx)
                    .await
                    .map_err(|err| SeedError::load(collection, err))
            }
            Self::Factory(provider) => provider
                .provide(ctx)
                .await
                .map_err(|err| SeedError::load(collection, err)),
        }
    }
}

fn documents_from(
    items: Vec<serde_json::Value>,
) -> anyhow::Result<Vec<Document>> {
    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::Object(fields) => Ok(fields),
            other => bail!("seed document must be an object, got {other}"),
        })
        .collect()
}

/// Ordered mapping from collection name to seed source. Insertion order
/// defines processing order; re-adding a name replaces its source in place.
#[derive(Debug, Clone, Default)]
pub struct SeedSpec {
    entries: Vec<(String, SeedSource)>,
}

impl SeedSpec {
    pub fn new() -> Self { Self::default() }

    pub fn with_collection(
        mut self, name: impl Into<String>, source: SeedSource,
    ) -> Self {
        let name = name.into();
        if let Some(entry) =
            self.entries.iter_mut().find(|(existing, _)| *existing == name)
        {
            entry.1 = source;
        }
        else {
            self.entries.push((name, source));
        }
        self
    }

    /// Builds a spec from a JSON object mapping collection names to source
    /// shapes, preserving key order.
    pub fn from_value(value: serde_json::Value) -> anyhow::Result<Self> {
        let serde_json::Value::Object(fields) = value else {
            bail!("seed spec must be an object keyed by collection name");
        };
        let mut spec = Self::new();
        for (collection, source) in fields {
            let source = SeedSource::from_value(source).with_context(|| {
                format!("invalid seed source for collection {collection}")
            })?;
            spec = spec.with_collection(collection, source);
        }
        Ok(spec)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SeedSource)> {
        self.entries
            .iter()
            .map(|(name, source)| (name.as_str(), source))
    }
}

/// Explicit mapping from source identifiers to providers; replaces any
/// dynamic loading of seed modules by path.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    providers: HashMap<String, Arc<dyn SourceProvider>>,
}

impl SourceRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn with_provider(
        mut self, name: impl Into<String>,
        provider: impl SourceProvider + 'static,
    ) -> Self {
        self.providers.insert(name.into(), Arc::new(provider));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SourceProvider>> {
        self.providers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn spec_preserves_insertion_order() {
        let spec = SeedSpec::new()
            .with_collection("b", SeedSource::Inline(Vec::new()))
            .with_collection("a", SeedSource::Inline(Vec::new()))
            .with_collection("c", SeedSource::Inline(Vec::new()));
        let order: Vec<&str> = spec.iter().map(|(name, _)| name).collect();
        assert_eq!(order, ["b", "a", "c"]);
    }

    #[test]
    fn readding_a_collection_replaces_in_place() {
        let spec = SeedSpec::new()
            .with_collection("a", SeedSource::Inline(Vec::new()))
            .with_collection("b", SeedSource::Inline(Vec::new()))
            .with_collection("a", SeedSource::Registered("x".to_string()));
        assert_eq!(spec.len(), 2);
        let order: Vec<&str> = spec.iter().map(|(name, _)| name).collect();
        assert_eq!(order, ["a", "b"]);
        assert!(matches!(
            spec.iter().next().unwrap().1,
            SeedSource::Registered(_)
        ));
    }

    #[test]
    fn from_value_parses_all_shapes() {
        let spec = SeedSpec::from_value(json!({
            "users": [{"name": "ada"}],
            "events": {"data": [{"kind": "click"}], "indexes": [{"kind": 1}]},
            "sessions": "session-source",
        }))
        .unwrap();

        let order: Vec<&str> = spec.iter().map(|(name, _)| name).collect();
        assert_eq!(order, ["users", "events", "sessions"]);

        let sources: Vec<&SeedSource> =
            spec.iter().map(|(_, source)| source).collect();
        assert!(matches!(sources[0], SeedSource::Inline(data) if data.len() == 1));
        assert!(matches!(
            sources[1],
            SeedSource::Dataset { data, indexes }
                if data.len() == 1 && indexes.len() == 1
        ));
        assert!(
            matches!(sources[2], SeedSource::Registered(name) if name == "session-source")
        );
    }

    #[test]
    fn from_value_rejects_bad_shapes() {
        assert!(SeedSpec::from_value(json!([])).is_err());
        assert!(SeedSpec::from_value(json!({"a": 1})).is_err());
        assert!(SeedSpec::from_value(json!({"a": [1]})).is_err());
        assert!(SeedSpec::from_value(json!({"a": {"indexes": []}})).is_err());
        assert!(
            SeedSpec::from_value(json!({"a": {"data": "nope"}})).is_err()
        );
    }

    #[test]
    fn registry_lookup() {
        struct Empty;

        #[async_trait]
        impl SourceProvider for Empty {
            async fn provide(
                &self, _ctx: &SeedContext,
            ) -> anyhow::Result<ResolvedSource> {
                Ok(ResolvedSource::default())
            }
        }

        let registry = SourceRegistry::new().with_provider("empty", Empty);
        assert!(registry.contains("empty"));
        assert!(registry.get("missing").is_none());
    }
}
