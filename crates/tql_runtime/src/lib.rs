//! Runtime for tql.
//!
//! This crate provides the execution runtime:
//! - `executor`: Validates and executes operations
//! - `collect`: Field collection and `@skip`/`@include`
//! - `config`: Executor configuration
//! - `response`: Requests and responses

mod collect;
pub mod config;
pub mod executor;
pub mod response;

pub use config::ExecutorConfig;
pub use executor::Executor;
pub use response::{QueryDocument, Request, Response};

pub use tql_core::{FieldError, GraphError, Map, Value};
pub use tql_schema::{Context, Schema};
