#[derive(Debug, Clone, serde::Deserialize)]
pub struct MongoDbConfig {
    pub uri: String,
    pub database: String,
    #[serde(default)]
    pub app_name: Option<String>,
}

impl MongoDbConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            app_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_config() {
        let config: MongoDbConfig = serde_json::from_str(
            r#"{"uri": "mongodb://localhost:27017", "database": "app"}"#,
        )
        .unwrap();
        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "app");
        assert!(config.app_name.is_none());
    }
}
