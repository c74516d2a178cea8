//! Server module: host, builder and HTTP exposures
//!
//! The `ServerBuilder` wires a store and a configuration into a
//! `ServerHost`, then exposes it over HTTP:
//! - `POST /graphql` and `GET /graphql/schema`
//! - `GET /health` and `GET /healthz`

pub mod builder;
pub mod exposure;
pub mod host;
pub mod router;
pub mod telemetry;

pub use builder::ServerBuilder;
pub use exposure::graphql::{GraphQLExecutor, GraphQLRequest};
pub use host::ServerHost;
