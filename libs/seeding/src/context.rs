use std::sync::Arc;

/// Runtime context handed to seed-source providers: the target database
/// name plus whatever settings the host wants providers to see.
#[derive(Debug, Clone)]
pub struct SeedContext {
    database: String,
    settings: Arc<serde_json::Value>,
}

impl SeedContext {
    pub fn new(
        database: impl Into<String>, settings: serde_json::Value,
    ) -> Self {
        Self {
            database: database.into(),
            settings: Arc::new(settings),
        }
    }

    pub fn database(&self) -> &str { &self.database }

    pub fn settings(&self) -> &serde_json::Value { &self.settings }
}
