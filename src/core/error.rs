//! Typed error handling for member-graph
//!
//! Errors are grouped by category so that callers can match on the failure
//! they care about instead of inspecting a generic `anyhow::Error`.
//!
//! # Error Categories
//!
//! - [`LoaderError`]: batched relation loading (bulk fetch failures, misuse)
//! - [`EntityError`]: entity lookups and mutations
//! - [`ValidationError`]: request arguments and mutation inputs
//! - [`StorageError`]: storage backends
//! - [`GraphQLError`]: parsing, operation selection and query validation
//! - [`ConfigError`]: configuration loading
//!
//! # Example
//!
//! ```rust,ignore
//! match executor.execute(request).await {
//!     Ok(response) => Json(response).into_response(),
//!     Err(GraphError::GraphQL(GraphQLError::DepthLimitExceeded { max, depth })) => {
//!         tracing::warn!(max, depth, "rejected deep query");
//!         GraphError::from(GraphQLError::DepthLimitExceeded { max, depth }).into_response()
//!     }
//!     Err(e) => e.into_response(),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::sync::Arc;

/// The main error type for member-graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Batched loading errors
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// Entity-related errors
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// GraphQL-specific errors
    #[error(transparent)]
    GraphQL(#[from] GraphQLError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error entry as returned in a GraphQL `errors` array
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub extensions: ErrorExtensions,
}

/// Machine-readable part of an [`ErrorResponse`]
#[derive(Debug, Clone, Serialize)]
pub struct ErrorExtensions {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl GraphError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GraphError::Loader(e) => e.status_code(),
            GraphError::Entity(e) => e.status_code(),
            GraphError::Validation(_) => StatusCode::BAD_REQUEST,
            GraphError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GraphError::GraphQL(e) => e.status_code(),
            GraphError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GraphError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            GraphError::Loader(e) => e.error_code(),
            GraphError::Entity(e) => e.error_code(),
            GraphError::Validation(_) => "VALIDATION_ERROR",
            GraphError::Storage(_) => "STORAGE_ERROR",
            GraphError::GraphQL(e) => e.error_code(),
            GraphError::Config(_) => "CONFIG_ERROR",
            GraphError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Classify an `anyhow::Error` coming out of resolver plumbing
    ///
    /// Typed errors wrapped in the `anyhow` chain are recovered; anything else
    /// is reported as internal.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let err = match err.downcast::<GraphError>() {
            Ok(e) => return e,
            Err(err) => err,
        };
        let err = match err.downcast::<LoaderError>() {
            Ok(e) => return e.into(),
            Err(err) => err,
        };
        let err = match err.downcast::<EntityError>() {
            Ok(e) => return e.into(),
            Err(err) => err,
        };
        let err = match err.downcast::<ValidationError>() {
            Ok(e) => return e.into(),
            Err(err) => err,
        };
        let err = match err.downcast::<StorageError>() {
            Ok(e) => return e.into(),
            Err(err) => err,
        };
        match err.downcast::<GraphQLError>() {
            Ok(e) => e.into(),
            Err(err) => GraphError::Internal(format!("{:#}", err)),
        }
    }

    /// Convert to a GraphQL error entry
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            message: self.to_string(),
            extensions: ErrorExtensions {
                code: self.error_code().to_string(),
                details: self.details(),
            },
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            GraphError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({ "entity_type": entity_type, "id": id }))
            }
            GraphError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            GraphError::GraphQL(GraphQLError::DepthLimitExceeded { max, depth }) => {
                Some(serde_json::json!({ "max": max, "depth": depth }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for GraphError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "errors": [self.to_response()] }));
        (status, body).into_response()
    }
}

// =============================================================================
// Loader Errors
// =============================================================================

/// Errors raised by the batched loading layer
///
/// Loader errors are cloneable: a single bulk fetch failure is delivered to
/// every caller waiting on the same batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoaderError {
    /// `enqueue` was called with an empty key
    #[error("Empty key enqueued on loader '{scope}'")]
    EmptyKey { scope: String },

    /// No relation descriptor is declared for the field
    #[error("No relation descriptor for {parent_type}.{field}")]
    MissingDescriptor { parent_type: String, field: String },

    /// The bulk fetch round trip failed
    #[error("Bulk fetch for '{scope}' failed: {cause:#}")]
    BulkFetch {
        scope: String,
        cause: Arc<anyhow::Error>,
    },

    /// The bulk fetch returned a result not aligned with its keys
    #[error("Bulk fetch for '{scope}' returned {actual} values for {expected} keys")]
    ShapeMismatch {
        scope: String,
        expected: usize,
        actual: usize,
    },

    /// The loader was dropped before its pending batch could be dispatched
    #[error("Loader '{scope}' was dropped with a pending batch")]
    Abandoned { scope: String },
}

impl LoaderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LoaderError::EmptyKey { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            LoaderError::MissingDescriptor { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            LoaderError::BulkFetch { .. } => StatusCode::BAD_GATEWAY,
            LoaderError::ShapeMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            LoaderError::Abandoned { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            LoaderError::EmptyKey { .. } => "LOADER_EMPTY_KEY",
            LoaderError::MissingDescriptor { .. } => "LOADER_MISSING_DESCRIPTOR",
            LoaderError::BulkFetch { .. } => "LOADER_BULK_FETCH_FAILED",
            LoaderError::ShapeMismatch { .. } => "LOADER_SHAPE_MISMATCH",
            LoaderError::Abandoned { .. } => "LOADER_ABANDONED",
        }
    }

    /// Whether this error is a programming error rather than a runtime failure
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            LoaderError::EmptyKey { .. } | LoaderError::MissingDescriptor { .. }
        )
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity operations
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// Entity was not found
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: String },

    /// Entity already exists (conflict)
    #[error("{entity_type} with {field} '{value}' already exists")]
    AlreadyExists {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Entity operation failed
    #[error("Failed to {operation} {entity_type}: {message}")]
    OperationFailed {
        entity_type: String,
        operation: String,
        message: String,
    },
}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } => StatusCode::CONFLICT,
            EntityError::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
            EntityError::OperationFailed { .. } => "ENTITY_OPERATION_FAILED",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Field-level validation failures on a mutation input
    #[error("Validation errors: {}", join_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    /// The input could not be decoded into the expected shape
    #[error("Invalid input for '{argument}': {message}")]
    InvalidInput { argument: String, message: String },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument { argument: String },

    /// Invalid UUID format
    #[error("Invalid UUID format: {value}")]
    InvalidUuid { value: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn join_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldValidationError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Query execution error
    #[error("{backend} query error: {message}")]
    QueryError { backend: String, message: String },

    /// Column not known for the table
    #[error("Unknown column '{column}' on table {table}")]
    UnknownColumn { table: String, column: String },

    /// Backend not available
    #[error("Storage backend '{backend}' is unavailable")]
    Unavailable { backend: String },
}

// =============================================================================
// GraphQL Errors
// =============================================================================

/// Errors related to GraphQL operations
#[derive(Debug, thiserror::Error)]
pub enum GraphQLError {
    /// Query parsing error
    #[error("GraphQL parse error: {message}")]
    ParseError { message: String },

    /// No operation (or no operation with the requested name) in the document
    #[error("Operation not found: {name}")]
    OperationNotFound { name: String },

    /// Invalid operation
    #[error("Invalid GraphQL operation '{operation}': {message}")]
    InvalidOperation { operation: String, message: String },

    /// Field does not exist on the type
    #[error("Cannot query field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    /// Fragment spread refers to an undefined fragment
    #[error("Unknown fragment '{name}'")]
    UnknownFragment { name: String },

    /// Query nesting exceeds the configured limit
    #[error("Query exceeds maximum depth of {max} (found {depth})")]
    DepthLimitExceeded { max: usize, depth: usize },
}

impl GraphQLError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GraphQLError::ParseError { .. } => StatusCode::BAD_REQUEST,
            GraphQLError::OperationNotFound { .. } => StatusCode::BAD_REQUEST,
            GraphQLError::InvalidOperation { .. } => StatusCode::BAD_REQUEST,
            GraphQLError::UnknownField { .. } => StatusCode::BAD_REQUEST,
            GraphQLError::UnknownFragment { .. } => StatusCode::BAD_REQUEST,
            GraphQLError::DepthLimitExceeded { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GraphQLError::ParseError { .. } => "GRAPHQL_PARSE_ERROR",
            GraphQLError::OperationNotFound { .. } => "GRAPHQL_OPERATION_NOT_FOUND",
            GraphQLError::InvalidOperation { .. } => "GRAPHQL_INVALID_OPERATION",
            GraphQLError::UnknownField { .. } => "GRAPHQL_UNKNOWN_FIELD",
            GraphQLError::UnknownFragment { .. } => "GRAPHQL_UNKNOWN_FRAGMENT",
            GraphQLError::DepthLimitExceeded { .. } => "GRAPHQL_DEPTH_LIMIT_EXCEEDED",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_deref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("Failed to read config file '{path}': {message}")]
    IoError { path: String, message: String },
}
