//! Core module containing the data model, store trait and error types

pub mod entity;
pub mod error;
pub mod store;

pub use entity::{MemberTypeId, Table};
pub use error::{GraphError, LoaderError};
pub use store::{JoinSpec, LinkedRow, Row, RowFilter, Store};
