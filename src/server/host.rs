//! Server host for transport-agnostic API exposure
//!
//! The host holds the state every exposure needs: the configuration and
//! the shared store handle. It knows nothing about HTTP.

use crate::config::ServerConfig;
use crate::core::store::Store;
use anyhow::Result;
use std::sync::Arc;

/// Host context containing all server state
///
/// # Example
///
/// ```rust,ignore
/// let host = Arc::new(ServerHost::from_builder_components(store, config)?);
/// let rest_app = RestExposure::build_router(host.clone(), vec![])?;
/// let graphql_app = GraphQLExposure::build_router(host)?;
/// ```
pub struct ServerHost {
    /// Validated server configuration
    pub config: Arc<ServerConfig>,

    /// Store shared by every execution
    pub store: Arc<dyn Store>,
}

impl ServerHost {
    /// Build the host from builder components
    ///
    /// Fails when the configuration does not validate.
    pub fn from_builder_components(store: Arc<dyn Store>, config: ServerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            store,
        })
    }

    /// SDL of the served schema
    pub fn schema_sdl(&self) -> &'static str {
        crate::server::exposure::graphql::schema::SCHEMA_SDL
    }
}
