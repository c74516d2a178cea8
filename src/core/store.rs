//! Store trait for the relational backend
//!
//! The loader layer only needs set-membership lookups ("column is one of
//! these keys"), optionally narrowed by an equality on a second column, and a
//! join lookup for many-to-many edges. Mutations use the remaining
//! row-level operations.

use crate::core::entity::Table;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A plain row record, keyed by column name
pub type Row = Map<String, Value>;

/// Read a column of a row as a lookup key
///
/// Strings are used as-is and numbers are stringified. Null and missing
/// columns have no key.
pub fn row_key(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Filter "`column` is one of `keys`", optionally "and `other` = `value`"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub keys: Vec<String>,
    pub and_eq: Option<(String, String)>,
}

impl RowFilter {
    /// Rows whose `column` is one of `keys`
    pub fn is_in(column: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            column: column.into(),
            keys,
            and_eq: None,
        }
    }

    /// Rows whose `column` equals `key`
    pub fn eq(column: impl Into<String>, key: impl Into<String>) -> Self {
        Self::is_in(column, vec![key.into()])
    }

    /// Narrow the filter with an equality on a second column
    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.and_eq = Some((column.into(), value.into()));
        self
    }

    /// Check a row against the filter
    pub fn matches(&self, row: &Row) -> bool {
        let Some(key) = row_key(row, &self.column) else {
            return false;
        };
        if !self.keys.contains(&key) {
            return false;
        }
        match &self.and_eq {
            Some((column, value)) => row_key(row, column).as_deref() == Some(value.as_str()),
            None => true,
        }
    }

    /// Columns referenced by the filter
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.column.as_str()).chain(self.and_eq.iter().map(|(c, _)| c.as_str()))
    }
}

/// Join through an edge table for many-to-many relations
///
/// Edge rows whose `owner_column` is one of the requested keys select the
/// target rows whose `id` equals the edge's `target_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSpec {
    pub table: Table,
    pub owner_column: &'static str,
    pub target_column: &'static str,
}

/// A target row together with every requested owner key it is linked to
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedRow {
    pub row: Row,
    pub owners: Vec<String>,
}

/// Relational store used by the executor and the relation loaders
///
/// Every method is one round trip to the backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// All rows of a table, in storage order
    async fn list(&self, table: Table) -> Result<Vec<Row>>;

    /// Rows matching a filter
    async fn find(&self, table: Table, filter: &RowFilter) -> Result<Vec<Row>>;

    /// Target rows linked through an edge table to any of `keys`
    ///
    /// Each target row appears once, with the subset of `keys` that own it.
    async fn find_through(
        &self,
        target: Table,
        join: &JoinSpec,
        keys: &[String],
    ) -> Result<Vec<LinkedRow>>;

    /// Insert a row and return it as stored
    async fn insert(&self, table: Table, row: Row) -> Result<Row>;

    /// Apply a partial update to the row with the given id
    ///
    /// Returns `None` when no such row exists.
    async fn update(&self, table: Table, id: &str, patch: Row) -> Result<Option<Row>>;

    /// Delete rows matching a filter and return how many were removed
    async fn delete(&self, table: Table, filter: &RowFilter) -> Result<u64>;
}
