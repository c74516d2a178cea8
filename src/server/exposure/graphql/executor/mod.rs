//! GraphQL executor module
//!
//! Executes parsed documents against the store, loading relation fields
//! through the batched loader.
//!
//! The executor is split into several sub-modules:
//! - `core`: Operation selection and orchestration
//! - `context`: Per-execution state (loading context, variables, errors)
//! - `query_executor`: Root query fields
//! - `mutation_executor`: Root mutation fields
//! - `field_resolver`: Object, list and relation field resolution
//! - `utils`: Argument extraction and conversions

mod context;
mod core;
mod field_resolver;
mod mutation_executor;
mod query_executor;
mod utils;

pub use context::{ExecutionContext, FieldError, Path};
pub use self::core::{GraphQLExecutor, GraphQLRequest};
