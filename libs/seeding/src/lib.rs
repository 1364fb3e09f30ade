//! Fixture seeding for document databases.
//!
//! A [`DataSeeder`] takes a declarative [`SeedSpec`] and, per collection,
//! decides whether seeding is required, optionally resets the collection,
//! loads and preprocesses documents (resolving `js:{...}` scripted fields
//! through a [`ScriptEngine`]) and inserts them, then builds any declared
//! indexes. The database is supplied as a
//! [`DocumentDatabase`](document_traits::DocumentDatabase) capability
//! object at construction.

pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod executor;
pub mod expr;
pub mod preprocess;
pub mod script;
pub mod spec;

pub use config::{DatabaseForce, ForceFlag, SeedingConfig};
pub use context::SeedContext;
pub use decision::{DecisionEngine, SeedCheck};
pub use error::{SeedError, SeedResult};
pub use executor::{CollectionOutcome, DataSeeder, SeedReport};
pub use expr::ExprEngine;
pub use preprocess::{PreprocessError, Preprocessor};
pub use script::{HelperFn, Helpers, ScriptEngine, ScriptError};
pub use spec::{
    ResolvedSource, SeedSource, SeedSpec, SourceProvider, SourceRegistry,
};
