//! Router assembly across exposures

use super::exposure::{GraphQLExposure, RestExposure};
use super::host::ServerHost;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Merge the REST and GraphQL exposures of a host into one router
///
/// Every request is traced through `tower-http`'s `TraceLayer`.
pub fn combine_exposures(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
    let rest_router = RestExposure::build_router(host.clone(), custom_routes)?;
    let graphql_router = GraphQLExposure::build_router(host)?;

    Ok(rest_router
        .merge(graphql_router)
        .layer(TraceLayer::new_for_http()))
}
