//! REST endpoints served next to the GraphQL API
//!
//! Only operational routes live here; the data API is GraphQL.

use super::super::host::ServerHost;
use anyhow::Result;
use axum::{Extension, Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

/// REST exposure: health checks plus caller-supplied routes
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// Returns a router with:
    /// - Health check routes (`/health`, `/healthz`)
    /// - Custom routes
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let mut app = Self::health_routes().layer(Extension(host));

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app)
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check(Extension(host): Extension<Arc<ServerHost>>) -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "member-graph",
            "max_query_depth": host.config.max_query_depth,
        }))
    }
}
