//! Per-request batched data loading
//!
//! The executor never queries the store for a relation directly. It asks a
//! [`RelationResolver`] for the related rows of one parent, and the resolver
//! routes the request to the [`Batcher`] of the current field occurrence so
//! that every sibling parent is served by a single bulk query.

pub mod batcher;
pub mod registry;
pub mod relation;

pub use batcher::{BatchFn, Batcher, LoadFuture};
pub use registry::{ScopeHandle, ScopeRegistry};
pub use relation::{Cardinality, Lookup, RELATIONS, Related, RelationDescriptor, RelationResolver};

use crate::core::store::Store;
use std::sync::Arc;

/// Loading context of one query execution
///
/// Holds the shared store handle and a fresh scope registry. Dropping the
/// context drops every batcher created during the execution.
pub struct LoadContext {
    pub store: Arc<dyn Store>,
    pub scopes: ScopeRegistry<Related>,
}

impl LoadContext {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            scopes: ScopeRegistry::new(),
        }
    }
}
