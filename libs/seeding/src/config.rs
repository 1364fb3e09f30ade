use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedingConfig {
    #[serde(default)]
    pub force: ForceFlag,
}

/// Force configuration, layered from global down to per-collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ForceFlag {
    Global(bool),
    Databases(HashMap<String, DatabaseForce>),
}

impl Default for ForceFlag {
    fn default() -> Self { Self::Global(false) }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DatabaseForce {
    All(bool),
    Collections(HashMap<String, bool>),
}

impl SeedingConfig {
    pub fn new(force: ForceFlag) -> Self { Self { force } }

    /// Force every database and collection.
    pub fn forced() -> Self { Self::new(ForceFlag::Global(true)) }

    /// Resolves whether seeding is forced for the (database, collection)
    /// pair. Precedence: global `true`, then per-database `true`, then the
    /// per-collection flag. Entries absent from the map resolve to false.
    pub fn is_forced(&self, database: &str, collection: &str) -> bool {
        match &self.force {
            ForceFlag::Global(flag) => *flag,
            ForceFlag::Databases(databases) => match databases.get(database) {
                None => false,
                Some(DatabaseForce::All(flag)) => *flag,
                Some(DatabaseForce::Collections(collections)) => {
                    collections.get(collection).copied().unwrap_or(false)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn per_collection(
        database: &str, collection: &str, flag: bool,
    ) -> SeedingConfig {
        let mut collections = HashMap::new();
        collections.insert(collection.to_string(), flag);
        let mut databases = HashMap::new();
        databases.insert(
            database.to_string(),
            DatabaseForce::Collections(collections),
        );
        SeedingConfig::new(ForceFlag::Databases(databases))
    }

    #[test]
    fn default_is_not_forced() {
        let config = SeedingConfig::default();
        assert!(!config.is_forced("app", "users"));
    }

    #[test]
    fn global_true_forces_everything() {
        let config = SeedingConfig::forced();
        assert!(config.is_forced("app", "users"));
        assert!(config.is_forced("other", "events"));
    }

    #[test]
    fn database_level_true_forces_all_its_collections() {
        let mut databases = HashMap::new();
        databases.insert("app".to_string(), DatabaseForce::All(true));
        let config = SeedingConfig::new(ForceFlag::Databases(databases));

        assert!(config.is_forced("app", "users"));
        assert!(config.is_forced("app", "events"));
        assert!(!config.is_forced("other", "users"));
    }

    #[test]
    fn collection_level_flag_is_respected() {
        assert!(per_collection("app", "users", true).is_forced("app", "users"));
        assert!(!per_collection("app", "users", false)
            .is_forced("app", "users"));
    }

    #[test]
    fn missing_collection_key_is_not_forced() {
        let config = per_collection("app", "users", true);
        assert!(!config.is_forced("app", "events"));
    }

    #[test]
    fn missing_database_key_is_not_forced() {
        let config = per_collection("app", "users", true);
        assert!(!config.is_forced("other", "users"));
    }

    #[test]
    fn deserializes_all_three_shapes() {
        let global: SeedingConfig =
            serde_json::from_str(r#"{"force": true}"#).unwrap();
        assert!(global.is_forced("app", "users"));

        let database: SeedingConfig =
            serde_json::from_str(r#"{"force": {"app": true}}"#).unwrap();
        assert!(database.is_forced("app", "users"));
        assert!(!database.is_forced("other", "users"));

        let collection: SeedingConfig = serde_json::from_str(
            r#"{"force": {"app": {"users": true, "events": false}}}"#,
        )
        .unwrap();
        assert!(collection.is_forced("app", "users"));
        assert!(!collection.is_forced("app", "events"));
        assert!(!collection.is_forced("app", "sessions"));
    }

    #[test]
    fn absent_force_field_defaults_off() {
        let config: SeedingConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.is_forced("app", "users"));
    }
}
