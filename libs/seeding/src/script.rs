use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use fake::{
    Fake,
    faker::{internet::en::SafeEmail, lorem::en::Word, name::en::Name},
};
use rand::{Rng, rng};
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("unexpected character `{0}` in expression")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    #[error("unknown helper `{0}`")]
    UnknownHelper(String),
    #[error("helper `{name}` failed: {message}")]
    Helper { name: String, message: String },
    #[error("type error: {0}")]
    Type(String),
}

impl ScriptError {
    pub(crate) fn helper(name: &str, message: impl Into<String>) -> Self {
        Self::Helper {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Computes the replacement value for a scripted field. Implementations
/// must not reach into ambient process state; everything a script may use
/// comes from the engine itself.
#[async_trait]
pub trait ScriptEngine: Send + Sync {
    async fn eval(&self, script: &str) -> Result<Value, ScriptError>;
}

pub type HelperFn =
    Arc<dyn Fn(&[Value]) -> Result<Value, ScriptError> + Send + Sync>;

/// Named helper table available to scripts.
#[derive(Clone, Default)]
pub struct Helpers {
    functions: HashMap<String, HelperFn>,
}

impl Helpers {
    pub fn new() -> Self { Self::default() }

    /// The stock seeding helpers: id and time generators plus a few fakers.
    pub fn standard() -> Self {
        Self::new()
            .with_helper("uid", |args| {
                expect_arity("uid", args, 0)?;
                Ok(json!(Uuid::now_v7().to_string()))
            })
            .with_helper("now", |args| {
                expect_arity("now", args, 0)?;
                Ok(json!(Utc::now().to_rfc3339()))
            })
            .with_helper("timestamp", |args| {
                expect_arity("timestamp", args, 0)?;
                Ok(json!(Utc::now().timestamp_millis()))
            })
            .with_helper("randomInt", |args| {
                expect_arity("randomInt", args, 2)?;
                let min = int_arg("randomInt", args, 0)?;
                let max = int_arg("randomInt", args, 1)?;
                if min > max {
                    return Err(ScriptError::helper(
                        "randomInt",
                        format!("empty range {min}..={max}"),
                    ));
                }
                Ok(json!(rng().random_range(min..=max)))
            })
            .with_helper("fullName", |args| {
                expect_arity("fullName", args, 0)?;
                Ok(json!(Name().fake::<String>()))
            })
            .with_helper("word", |args| {
                expect_arity("word", args, 0)?;
                Ok(json!(Word().fake::<String>().to_lowercase()))
            })
            .with_helper("email", |args| {
                expect_arity("email", args, 0)?;
                Ok(json!(SafeEmail().fake::<String>()))
            })
    }

    pub fn with_helper(
        mut self, name: impl Into<String>,
        function: impl Fn(&[Value]) -> Result<Value, ScriptError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    pub fn get(&self, name: &str) -> Option<&HelperFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

fn expect_arity(
    name: &str, args: &[Value], arity: usize,
) -> Result<(), ScriptError> {
    if args.len() == arity {
        Ok(())
    }
    else {
        Err(ScriptError::helper(
            name,
            format!("expected {arity} argument(s), got {}", args.len()),
        ))
    }
}

fn int_arg(
    name: &str, args: &[Value], index: usize,
) -> Result<i64, ScriptError> {
    args[index].as_i64().ok_or_else(|| {
        ScriptError::helper(
            name,
            format!("argument {index} must be an integer, got {}", args[index]),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_helpers_are_registered() {
        let helpers = Helpers::standard();
        for name in
            ["uid", "now", "timestamp", "randomInt", "fullName", "word", "email"]
        {
            assert!(helpers.contains(name), "missing helper {name}");
        }
    }

    #[test]
    fn uid_yields_distinct_ids() {
        let helpers = Helpers::standard();
        let uid = helpers.get("uid").unwrap();
        assert_ne!(uid(&[]).unwrap(), uid(&[]).unwrap());
    }

    #[test]
    fn random_int_stays_in_range() {
        let helpers = Helpers::standard();
        let random_int = helpers.get("randomInt").unwrap();
        for _ in 0..50 {
            let value =
                random_int(&[json!(3), json!(7)]).unwrap().as_i64().unwrap();
            assert!((3..=7).contains(&value));
        }
    }

    #[test]
    fn random_int_rejects_empty_range() {
        let helpers = Helpers::standard();
        let random_int = helpers.get("randomInt").unwrap();
        let err = random_int(&[json!(9), json!(2)]).unwrap_err();
        assert!(matches!(err, ScriptError::Helper { .. }));
    }

    #[test]
    fn arity_is_enforced() {
        let helpers = Helpers::standard();
        let uid = helpers.get("uid").unwrap();
        assert!(matches!(
            uid(&[json!(1)]).unwrap_err(),
            ScriptError::Helper { .. }
        ));
    }
}
