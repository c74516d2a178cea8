//! Query execution for GraphQL

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

use super::context::{ExecutionContext, Path};
use super::field_resolver::{self, FieldGroup};
use super::utils;
use crate::core::entity::{MemberTypeId, Table};
use crate::core::error::{GraphQLError, ValidationError};
use crate::core::store::RowFilter;
use crate::loader::relation::{Lookup, SUBSCRIBED_TO_USER, USER_SUBSCRIBED_TO};
use crate::loader::RelationDescriptor;

/// Resolve a root query field (e.g. "users", "post", "subscribedToUser")
pub async fn resolve_query_field<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    path: Path,
) -> Result<Value> {
    let field = group.field;
    let field_name = field.name.as_str();

    match field_name {
        "memberTypes" => list(ctx, group, Table::MemberType, path).await,
        "users" => list(ctx, group, Table::User, path).await,
        "posts" => list(ctx, group, Table::Post, path).await,
        "profiles" => list(ctx, group, Table::Profile, path).await,

        "memberType" => {
            let raw = utils::string_arg(field, "id", &ctx.variables)?;
            let id = MemberTypeId::parse(&raw).ok_or_else(|| ValidationError::InvalidInput {
                argument: "id".to_string(),
                message: format!("'{}' is not a member type", raw),
            })?;
            find_one(ctx, group, Table::MemberType, id.as_str(), path).await
        }
        "user" | "post" | "profile" => {
            let table = match field_name {
                "user" => Table::User,
                "post" => Table::Post,
                _ => Table::Profile,
            };
            let id = utils::uuid_arg(field, "id", &ctx.variables)?;
            find_one(ctx, group, table, &id, path).await
        }

        // Subscribers of the given author
        "subscribedToUser" => through(ctx, group, &SUBSCRIBED_TO_USER, path).await,
        // Authors the given user subscribes to
        "userSubscribedTo" => through(ctx, group, &USER_SUBSCRIBED_TO, path).await,

        _ => Err(GraphQLError::UnknownField {
            type_name: "Query".to_string(),
            field: field_name.to_string(),
        }
        .into()),
    }
}

/// Every row of a table
async fn list<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    table: Table,
    path: Path,
) -> Result<Value> {
    let rows = ctx.load.store.list(table).await?;
    let rows = rows.into_iter().map(Arc::new).collect();
    Ok(field_resolver::resolve_list(ctx, table, rows, group.selection_sets.clone(), path).await)
}

/// The row with the given id, or null
async fn find_one<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    table: Table,
    id: &str,
    path: Path,
) -> Result<Value> {
    let rows = ctx.load.store.find(table, &RowFilter::eq("id", id)).await?;
    match rows.into_iter().next() {
        Some(row) => {
            let selection_sets = group.selection_sets.clone();
            Ok(field_resolver::resolve_object(ctx, table, Arc::new(row), selection_sets, path).await)
        }
        None => Ok(Value::Null),
    }
}

/// Users linked to the `id` argument through a subscription edge
async fn through<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    descriptor: &'static RelationDescriptor,
    path: Path,
) -> Result<Value> {
    let id = utils::uuid_arg(group.field, "id", &ctx.variables)?;
    let Lookup::Through { target, join } = descriptor.lookup else {
        return Err(anyhow::anyhow!("{} is not a join relation", descriptor.name));
    };

    let linked = ctx.load.store.find_through(target, &join, &[id]).await?;
    let rows = linked.into_iter().map(|l| Arc::new(l.row)).collect();
    Ok(field_resolver::resolve_list(ctx, target, rows, group.selection_sets.clone(), path).await)
}
