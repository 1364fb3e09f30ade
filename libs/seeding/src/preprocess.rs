use std::sync::Arc;

use document_traits::Document;
use futures::future::try_join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::{
    expr::ExprEngine,
    script::{ScriptEngine, ScriptError},
};

static SCRIPT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"js:\{(.*?)\}").expect("script marker pattern"));

/// A well-formed script that failed to evaluate. Empty or unparsable
/// markers never produce this; they are logged and the field keeps its
/// literal value.
#[derive(Debug, Error)]
#[error("script evaluation failed in field `{field}`")]
pub struct PreprocessError {
    pub field: String,
    #[source]
    pub source: ScriptError,
}

/// Replaces `js:{...}` scripted fields with computed values.
#[derive(Clone)]
pub struct Preprocessor {
    engine: Arc<dyn ScriptEngine>,
}

impl Preprocessor {
    pub fn new(engine: Arc<dyn ScriptEngine>) -> Self { Self { engine } }

    /// Preprocessor over the constrained expression engine with the stock
    /// helper set.
    pub fn standard() -> Self { Self::new(Arc::new(ExprEngine::standard())) }

    /// Processes all documents concurrently; the returned batch keeps the
    /// input order.
    pub async fn process(
        &self, documents: Vec<Document>,
    ) -> Result<Vec<Document>, PreprocessError> {
        try_join_all(
            documents
                .iter()
                .map(|document| self.process_document(document)),
        )
        .await
    }

    /// Every field is evaluated against the incoming snapshot, so a field
    /// never observes a sibling's substitution from the same pass.
    async fn process_document(
        &self, snapshot: &Document,
    ) -> Result<Document, PreprocessError> {
        let mut processed = Document::new();
        for (field, value) in snapshot {
            processed
                .insert(field.clone(), self.process_field(field, value).await?);
        }
        Ok(processed)
    }

    async fn process_field(
        &self, field: &str, value: &Value,
    ) -> Result<Value, PreprocessError> {
        let Some(text) = value.as_str() else {
            return Ok(value.clone());
        };
        if !text.contains("js:{") {
            return Ok(value.clone());
        }

        let script = SCRIPT_MARKER
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str())
            .unwrap_or("");
        if script.is_empty() {
            warn!("invalid replacement script {text} in field {field}");
            return Ok(value.clone());
        }

        self.engine.eval(script).await.map_err(|source| {
            PreprocessError {
                field: field.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::script::Helpers;

    fn preprocessor() -> Preprocessor {
        let helpers = Helpers::new()
            .with_helper("three", |_| Ok(json!(3)))
            .with_helper("tag", |_| Ok(json!("seeded")));
        Preprocessor::new(Arc::new(ExprEngine::new(helpers)))
    }

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().expect("object literal").clone()
    }

    #[tokio::test]
    async fn scripted_field_is_replaced() {
        let processed = preprocessor()
            .process(vec![doc(json!({"v": "js:{three() * 2}"}))])
            .await
            .unwrap();
        assert_eq!(processed[0]["v"], json!(6));
    }

    #[tokio::test]
    async fn plain_fields_pass_through() {
        let input = doc(json!({"a": 1, "b": "text", "c": [1, 2], "d": null}));
        let processed =
            preprocessor().process(vec![input.clone()]).await.unwrap();
        assert_eq!(processed[0], input);
    }

    #[tokio::test]
    async fn empty_marker_keeps_literal() {
        let processed = preprocessor()
            .process(vec![doc(json!({"v": "js:{}"}))])
            .await
            .unwrap();
        assert_eq!(processed[0]["v"], json!("js:{}"));
    }

    #[tokio::test]
    async fn unclosed_marker_keeps_literal() {
        let processed = preprocessor()
            .process(vec![doc(json!({"v": "js:{three()"}))])
            .await
            .unwrap();
        assert_eq!(processed[0]["v"], json!("js:{three()"));
    }

    #[tokio::test]
    async fn failing_script_is_fatal() {
        let err = preprocessor()
            .process(vec![doc(json!({"v": "js:{missing()}"}))])
            .await
            .unwrap_err();
        assert_eq!(err.field, "v");
        assert!(matches!(err.source, ScriptError::UnknownHelper(_)));
    }

    #[tokio::test]
    async fn sibling_fields_are_evaluated_independently() {
        let processed = preprocessor()
            .process(vec![doc(json!({
                "first": "js:{tag()}",
                "second": "js:{tag()}",
                "third": "plain",
            }))])
            .await
            .unwrap();
        assert_eq!(processed[0]["first"], json!("seeded"));
        assert_eq!(processed[0]["second"], json!("seeded"));
        assert_eq!(processed[0]["third"], json!("plain"));
    }

    #[tokio::test]
    async fn batch_order_is_preserved() {
        let documents = (0..16)
            .map(|index| doc(json!({"index": index, "v": "js:{three()}"})))
            .collect();
        let processed = preprocessor().process(documents).await.unwrap();
        for (index, document) in processed.iter().enumerate() {
            assert_eq!(document["index"], json!(index));
            assert_eq!(document["v"], json!(3));
        }
    }

    #[tokio::test]
    async fn only_first_marker_is_substituted() {
        // The capture is non-greedy: one marker per field value.
        let processed = preprocessor()
            .process(vec![doc(json!({"v": "js:{three()} js:{tag()}"}))])
            .await
            .unwrap();
        assert_eq!(processed[0]["v"], json!(3));
    }
}
