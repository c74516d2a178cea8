//! Field and relation resolution for object types
//!
//! Every field of an object, and every object of a list, is resolved
//! concurrently. Sibling objects therefore request their relation rows in
//! the same scheduling tick, and the batcher of the field occurrence serves
//! all of them with one store round trip.

use futures::future::{BoxFuture, FutureExt, join_all};
use graphql_parser::query::{Field, Selection, SelectionSet, TypeCondition};
use serde_json::{Map, Value, json};
use std::sync::Arc;

use super::context::{ExecutionContext, Path, child_path};
use super::utils;
use crate::core::entity::Table;
use crate::core::error::GraphQLError;
use crate::core::store::Row;
use crate::loader::{Related, RelationResolver, ScopeHandle};
use crate::server::exposure::graphql::schema::{FieldKind, field_kind};

/// Fields sharing one response key
///
/// The first node carries the arguments and names the batching scope; the
/// sub-selections of every node are merged when the field resolves to rows.
pub struct FieldGroup<'a> {
    pub field: &'a Field<'a, String>,
    pub selection_sets: Vec<&'a SelectionSet<'a, String>>,
}

impl<'a> FieldGroup<'a> {
    pub fn key(&self) -> &'a str {
        utils::response_key(self.field)
    }
}

/// Flatten selection sets into the field groups to resolve on `type_name`
///
/// Fragment spreads and inline fragments are expanded when their type
/// condition matches and `@skip`/`@include` are applied. Groups keep the
/// order in which their response key first appears.
pub fn collect_fields<'a>(
    ctx: &ExecutionContext<'a>,
    type_name: &str,
    selection_sets: &[&'a SelectionSet<'a, String>],
) -> Result<Vec<FieldGroup<'a>>, GraphQLError> {
    let mut groups = Vec::new();
    for &selection_set in selection_sets {
        collect_into(ctx, type_name, selection_set, &mut groups)?;
    }
    Ok(groups)
}

fn collect_into<'a>(
    ctx: &ExecutionContext<'a>,
    type_name: &str,
    selection_set: &'a SelectionSet<'a, String>,
    groups: &mut Vec<FieldGroup<'a>>,
) -> Result<(), GraphQLError> {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => {
                if !utils::is_included(&field.directives, &ctx.variables) {
                    continue;
                }
                let key = utils::response_key(field);
                match groups.iter_mut().find(|group| group.key() == key) {
                    Some(group) => group.selection_sets.push(&field.selection_set),
                    None => groups.push(FieldGroup {
                        field,
                        selection_sets: vec![&field.selection_set],
                    }),
                }
            }
            Selection::FragmentSpread(spread) => {
                if !utils::is_included(&spread.directives, &ctx.variables) {
                    continue;
                }
                let fragment = ctx
                    .fragments
                    .get(spread.fragment_name.as_str())
                    .copied()
                    .ok_or_else(|| GraphQLError::UnknownFragment {
                        name: spread.fragment_name.clone(),
                    })?;
                let TypeCondition::On(condition) = &fragment.type_condition;
                if condition == type_name {
                    collect_into(ctx, type_name, &fragment.selection_set, groups)?;
                }
            }
            Selection::InlineFragment(inline) => {
                if !utils::is_included(&inline.directives, &ctx.variables) {
                    continue;
                }
                let applies = match &inline.type_condition {
                    Some(TypeCondition::On(condition)) => condition == type_name,
                    None => true,
                };
                if applies {
                    collect_into(ctx, type_name, &inline.selection_set, groups)?;
                }
            }
        }
    }
    Ok(())
}

/// Resolve the selected fields of one row
pub fn resolve_object<'a>(
    ctx: &'a ExecutionContext<'a>,
    table: Table,
    row: Arc<Row>,
    selection_sets: Vec<&'a SelectionSet<'a, String>>,
    path: Path,
) -> BoxFuture<'a, Value> {
    async move {
        let groups = match collect_fields(ctx, table.name(), &selection_sets) {
            Ok(groups) => groups,
            Err(err) => {
                ctx.record_error(&path, err.into());
                return Value::Null;
            }
        };

        let values = join_all(groups.iter().map(|group| {
            let field_path = child_path(&path, group.key());
            resolve_field(ctx, table, &row, group, field_path)
        }))
        .await;

        let mut result = Map::new();
        for (group, value) in groups.iter().zip(values) {
            result.insert(group.key().to_string(), value);
        }
        Value::Object(result)
    }
    .boxed()
}

/// Resolve a list of rows, one object per row
pub fn resolve_list<'a>(
    ctx: &'a ExecutionContext<'a>,
    table: Table,
    rows: Vec<Arc<Row>>,
    selection_sets: Vec<&'a SelectionSet<'a, String>>,
    path: Path,
) -> BoxFuture<'a, Value> {
    async move {
        let items = join_all(rows.into_iter().enumerate().map(|(index, row)| {
            resolve_object(ctx, table, row, selection_sets.clone(), child_path(&path, index))
        }))
        .await;
        Value::Array(items)
    }
    .boxed()
}

/// Resolve one field group of a row
///
/// Failures are recorded in the execution context and yield `null`.
async fn resolve_field<'a>(
    ctx: &'a ExecutionContext<'a>,
    table: Table,
    row: &Row,
    group: &FieldGroup<'a>,
    path: Path,
) -> Value {
    let field_name = group.field.name.as_str();

    match field_kind(table, field_name) {
        Some(FieldKind::TypeName) => json!(table.name()),
        Some(FieldKind::Scalar) => scalar(row, field_name),
        Some(FieldKind::Relation(descriptor)) => {
            let resolver = RelationResolver::new(descriptor);
            match resolver.resolve(&ctx.load, ScopeHandle::of(group.field), row).await {
                Ok(related) => {
                    resolve_related(
                        ctx,
                        descriptor.child_table(),
                        related,
                        group.selection_sets.clone(),
                        path,
                    )
                    .await
                }
                Err(err) => {
                    ctx.record_error(&path, err.into());
                    Value::Null
                }
            }
        }
        None => {
            ctx.record_error(
                &path,
                GraphQLError::UnknownField {
                    type_name: table.name().to_string(),
                    field: field_name.to_string(),
                }
                .into(),
            );
            Value::Null
        }
    }
}

/// Resolve the rows a relation produced
pub async fn resolve_related<'a>(
    ctx: &'a ExecutionContext<'a>,
    table: Table,
    related: Related,
    selection_sets: Vec<&'a SelectionSet<'a, String>>,
    path: Path,
) -> Value {
    match related {
        Related::One(Some(row)) => resolve_object(ctx, table, row, selection_sets, path).await,
        Related::One(None) => Value::Null,
        Related::Many(rows) => resolve_list(ctx, table, rows, selection_sets, path).await,
    }
}

/// Read a scalar column, falling back to its snake_case spelling
fn scalar(row: &Row, field_name: &str) -> Value {
    row.get(field_name)
        .or_else(|| row.get(&utils::camel_to_snake(field_name)))
        .cloned()
        .unwrap_or(Value::Null)
}
