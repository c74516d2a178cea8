//! Per-execution state shared by every resolver

use super::super::validation::Fragments;
use crate::core::error::{ErrorExtensions, GraphError};
use crate::core::store::Store;
use crate::loader::LoadContext;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};

/// Response path of a field: keys and list indices from the root
pub type Path = Vec<Value>;

/// Extend a path by one segment
pub fn child_path(path: &Path, segment: impl Into<Value>) -> Path {
    let mut child = path.clone();
    child.push(segment.into());
    child
}

/// Error entry for a field that failed to resolve
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub message: String,
    pub path: Path,
    pub extensions: ErrorExtensions,
}

/// State of one query execution
///
/// Owns the loading context, so every batcher created while resolving the
/// operation is dropped together with the execution.
pub struct ExecutionContext<'a> {
    pub load: LoadContext,
    pub variables: Map<String, Value>,
    pub fragments: Fragments<'a>,
    errors: Mutex<Vec<FieldError>>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(store: Arc<dyn Store>, variables: Map<String, Value>, fragments: Fragments<'a>) -> Self {
        Self {
            load: LoadContext::new(store),
            variables,
            fragments,
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Record a contained field error; the field itself resolves to null
    pub fn record_error(&self, path: &Path, err: anyhow::Error) {
        let err = GraphError::from_anyhow(err);
        let response = err.to_response();
        let path_value = Value::Array(path.clone());
        tracing::warn!(
            path = %path_value,
            code = %response.extensions.code,
            "field error: {}",
            response.message
        );
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FieldError {
                message: response.message,
                path: path.clone(),
                extensions: response.extensions,
            });
    }

    /// Drain the errors recorded so far, in the order they occurred
    pub fn take_errors(&self) -> Vec<FieldError> {
        std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
