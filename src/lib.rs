//! # member-graph
//!
//! A GraphQL API over users, posts, profiles, member types and subscription
//! edges, backed by a relational store.
//!
//! ## Features
//!
//! - **Batched relation loading**: every relation field occurrence in a query
//!   costs one store round trip, whatever the number of parent objects
//! - **Per-request scoping**: batching state lives in the execution context and
//!   never leaks across fields or requests
//! - **Deduplication**: the same key requested twice in one tick shares one
//!   pending result
//! - **Pluggable storage**: in-memory store by default, PostgreSQL with the
//!   `postgres` feature
//! - **Field-level error containment**: a failing relation nulls its field and
//!   reports an error entry while sibling fields still resolve
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use member_graph::prelude::*;
//!
//! let store = InMemoryStore::new().with_member_types();
//!
//! ServerBuilder::new()
//!     .with_store(store)
//!     .with_config(ServerConfig::from_yaml_file("member-graph.yaml")?)
//!     .serve("127.0.0.1:8000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod loader;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        entity::{MemberTypeId, Table},
        error::{
            ConfigError, EntityError, GraphError, GraphQLError, LoaderError, StorageError,
            ValidationError,
        },
        store::{JoinSpec, LinkedRow, Row, RowFilter, Store},
    };

    // === Loader ===
    pub use crate::loader::{
        Batcher, LoadContext, Related, RelationDescriptor, RelationResolver, ScopeHandle,
        ScopeRegistry,
    };

    // === Storage ===
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresStore;

    // === Config ===
    pub use crate::config::ServerConfig;

    // === Server ===
    pub use crate::server::{GraphQLExecutor, GraphQLRequest, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
