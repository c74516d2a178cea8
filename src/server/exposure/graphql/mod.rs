//! GraphQL API exposure
//!
//! Routes:
//! - `POST /graphql`: execute `{query, variables?, operationName?}`
//! - `GET /graphql/schema`: SDL of the API

pub mod schema;
pub mod validation;
mod executor;

pub use executor::{ExecutionContext, FieldError, GraphQLExecutor, GraphQLRequest, Path};

use crate::core::error::GraphError;
use crate::server::host::ServerHost;
use anyhow::Result;
use axum::{
    Router,
    extract::{Extension, Json},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

/// GraphQL API exposure implementation
pub struct GraphQLExposure;

impl GraphQLExposure {
    /// Build the GraphQL router from a host
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let host = Arc::new(builder.build_host()?);
    /// let graphql_app = GraphQLExposure::build_router(host)?;
    /// ```
    pub fn build_router(host: Arc<ServerHost>) -> Result<Router> {
        let router = Router::new()
            .route("/graphql", post(graphql_handler))
            .route("/graphql/schema", get(graphql_schema))
            .layer(Extension(host));

        Ok(router)
    }
}

/// Handler for GraphQL queries and mutations
///
/// Field errors travel inside a 200 response next to the partial `data`.
/// Request-level failures (unparsable document, unknown operation,
/// subscription, depth limit) are rejected before execution with a 400
/// and an `{errors}` body that carries no `data` key. Clients that expect
/// every GraphQL response to be a 200 must inspect `errors` on 400 too.
async fn graphql_handler(
    Extension(host): Extension<Arc<ServerHost>>,
    Json(request): Json<GraphQLRequest>,
) -> Response {
    let executor = GraphQLExecutor::new(host);

    match executor.execute_request(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            let err = GraphError::from_anyhow(e);
            tracing::warn!(code = err.error_code(), "rejected GraphQL request: {}", err);
            err.into_response()
        }
    }
}

/// Handler for GraphQL schema SDL export
async fn graphql_schema() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )],
        schema::SCHEMA_SDL,
    )
}
