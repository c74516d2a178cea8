//! In-memory implementation of the store for testing and development

use crate::core::entity::{MemberTypeId, Table};
use crate::core::error::StorageError;
use crate::core::store::{JoinSpec, LinkedRow, Row, RowFilter, Store, row_key};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

const BACKEND: &str = "in-memory";

/// In-memory relational store
///
/// Rows are kept per table in insertion order. Every trait call counts as
/// one round trip, which makes the store suitable for asserting batching
/// behaviour. Uses RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<Table, Vec<Row>>>>,
    round_trips: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the two member tiers
    pub fn with_member_types(self) -> Self {
        let tiers = [
            (MemberTypeId::Basic, 2.3, 20),
            (MemberTypeId::Business, 7.7, 100),
        ];
        if let Ok(mut tables) = self.tables.write() {
            let rows = tables.entry(Table::MemberType).or_default();
            for (id, discount, limit) in tiers {
                if !rows.iter().any(|r| row_key(r, "id").as_deref() == Some(id.as_str())) {
                    rows.push(to_row(json!({
                        "id": id.as_str(),
                        "discount": discount,
                        "postsLimitPerMonth": limit,
                    })));
                }
            }
        }
        self
    }

    /// Number of round trips served so far
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    fn begin(&self, table: Table, op: &'static str) {
        let n = self.round_trips.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(backend = BACKEND, %table, op, round_trip = n, "store round trip");
    }
}

fn to_row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn check_columns<'a>(table: Table, columns: impl IntoIterator<Item = &'a str>) -> Result<()> {
    for column in columns {
        if !table.has_column(column) {
            return Err(StorageError::UnknownColumn {
                table: table.name().to_string(),
                column: column.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn primary_key(table: Table, row: &Row) -> Vec<Option<String>> {
    table
        .primary_key()
        .iter()
        .map(|column| row_key(row, column))
        .collect()
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list(&self, table: Table) -> Result<Vec<Row>> {
        self.begin(table, "list");
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(tables.get(&table).cloned().unwrap_or_default())
    }

    async fn find(&self, table: Table, filter: &RowFilter) -> Result<Vec<Row>> {
        self.begin(table, "find");
        check_columns(table, filter.columns())?;
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(tables
            .get(&table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_through(
        &self,
        target: Table,
        join: &JoinSpec,
        keys: &[String],
    ) -> Result<Vec<LinkedRow>> {
        self.begin(target, "find_through");
        check_columns(join.table, [join.owner_column, join.target_column])?;
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let mut owners: HashMap<String, Vec<String>> = HashMap::new();
        for edge in tables.get(&join.table).into_iter().flatten() {
            let (Some(owner), Some(target_id)) = (
                row_key(edge, join.owner_column),
                row_key(edge, join.target_column),
            ) else {
                continue;
            };
            if wanted.contains(owner.as_str()) {
                owners.entry(target_id).or_default().push(owner);
            }
        }

        Ok(tables
            .get(&target)
            .into_iter()
            .flatten()
            .filter_map(|row| {
                let id = row_key(row, "id")?;
                let owners = owners.get(&id)?.clone();
                Some(LinkedRow {
                    row: row.clone(),
                    owners,
                })
            })
            .collect())
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row> {
        self.begin(table, "insert");
        check_columns(table, row.keys().map(String::as_str))?;
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let rows = tables.entry(table).or_default();
        let key = primary_key(table, &row);
        if key.iter().any(Option::is_none) {
            return Err(StorageError::QueryError {
                backend: BACKEND.to_string(),
                message: format!("{} row is missing its primary key", table),
            }
            .into());
        }
        if rows.iter().any(|r| primary_key(table, r) == key) {
            return Err(StorageError::QueryError {
                backend: BACKEND.to_string(),
                message: format!("duplicate primary key in {}", table),
            }
            .into());
        }

        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, id: &str, mut patch: Row) -> Result<Option<Row>> {
        self.begin(table, "update");
        patch.remove("id");
        check_columns(table, patch.keys().map(String::as_str))?;
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let Some(row) = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| row_key(r, "id").as_deref() == Some(id)))
        else {
            return Ok(None);
        };

        row.extend(patch);
        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: Table, filter: &RowFilter) -> Result<u64> {
        self.begin(table, "delete");
        check_columns(table, filter.columns())?;
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let Some(rows) = tables.get_mut(&table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok((before - rows.len()) as u64)
    }
}
