//! Mutation execution for GraphQL
//!
//! Inputs are deserialized into the typed DTOs of [`crate::core::entity`]
//! and validated before anything touches the store. Foreign keys are
//! checked explicitly so that backends without referential integrity
//! behave like the relational one.

use anyhow::Result;
use graphql_parser::query::Field;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use super::context::{ExecutionContext, Path};
use super::field_resolver::{self, FieldGroup};
use super::utils;
use crate::core::entity::{
    ChangePostInput, ChangeProfileInput, ChangeUserInput, CreatePostInput, CreateProfileInput,
    CreateUserInput, Table,
};
use crate::core::error::{EntityError, GraphQLError};
use crate::core::store::{Row, RowFilter};

/// Resolve a mutation field (e.g. "createUser", "deletePost", "subscribeTo")
pub async fn resolve_mutation_field<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    path: Path,
) -> Result<Value> {
    let field = group.field;
    let field_name = field.name.as_str();

    match field_name {
        "createUser" => create_user(ctx, group, path).await,
        "createPost" => create_post(ctx, group, path).await,
        "createProfile" => create_profile(ctx, group, path).await,

        "changeUser" => {
            let id = utils::uuid_arg(field, "id", &ctx.variables)?;
            let dto: ChangeUserInput = utils::input_arg(field, "dto", &ctx.variables)?;
            change(ctx, group, Table::User, &id, to_patch(&dto)?, path).await
        }
        "changePost" => {
            let id = utils::uuid_arg(field, "id", &ctx.variables)?;
            let dto: ChangePostInput = utils::input_arg(field, "dto", &ctx.variables)?;
            if let Some(author_id) = &dto.author_id {
                find_existing(ctx, Table::User, author_id).await?;
            }
            change(ctx, group, Table::Post, &id, to_patch(&dto)?, path).await
        }
        "changeProfile" => {
            let id = utils::uuid_arg(field, "id", &ctx.variables)?;
            let dto: ChangeProfileInput = utils::input_arg(field, "dto", &ctx.variables)?;
            change(ctx, group, Table::Profile, &id, to_patch(&dto)?, path).await
        }

        "deleteUser" => delete_user(ctx, field).await,
        "deletePost" => delete_by_id(ctx, field, Table::Post).await,
        "deleteProfile" => delete_by_id(ctx, field, Table::Profile).await,

        "subscribeTo" => subscribe_to(ctx, group, path).await,
        "unsubscribeFrom" => unsubscribe_from(ctx, field).await,

        _ => Err(GraphQLError::UnknownField {
            type_name: "Mutation".to_string(),
            field: field_name.to_string(),
        }
        .into()),
    }
}

async fn create_user<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    path: Path,
) -> Result<Value> {
    let field = group.field;
    let dto: CreateUserInput = utils::input_arg(field, "dto", &ctx.variables)?;
    let row = to_row(json!({
        "id": Uuid::new_v4().to_string(),
        "name": dto.name,
        "balance": dto.balance,
    }));

    let created = ctx.load.store.insert(Table::User, row).await?;
    tracing::debug!(id = ?created.get("id"), "created user");
    Ok(resolve(ctx, group, Table::User, created, path).await)
}

async fn create_post<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    path: Path,
) -> Result<Value> {
    let field = group.field;
    let dto: CreatePostInput = utils::input_arg(field, "dto", &ctx.variables)?;
    find_existing(ctx, Table::User, &dto.author_id).await?;

    let row = to_row(json!({
        "id": Uuid::new_v4().to_string(),
        "title": dto.title,
        "content": dto.content,
        "authorId": dto.author_id,
    }));

    let created = ctx.load.store.insert(Table::Post, row).await?;
    tracing::debug!(id = ?created.get("id"), "created post");
    Ok(resolve(ctx, group, Table::Post, created, path).await)
}

async fn create_profile<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    path: Path,
) -> Result<Value> {
    let field = group.field;
    let dto: CreateProfileInput = utils::input_arg(field, "dto", &ctx.variables)?;
    find_existing(ctx, Table::User, &dto.user_id).await?;
    find_existing(ctx, Table::MemberType, dto.member_type_id.as_str()).await?;

    let existing = ctx
        .load
        .store
        .find(Table::Profile, &RowFilter::eq("userId", dto.user_id.as_str()))
        .await?;
    if !existing.is_empty() {
        return Err(EntityError::AlreadyExists {
            entity_type: Table::Profile.name().to_string(),
            field: "userId".to_string(),
            value: dto.user_id,
        }
        .into());
    }

    let row = to_row(json!({
        "id": Uuid::new_v4().to_string(),
        "isMale": dto.is_male,
        "yearOfBirth": dto.year_of_birth,
        "userId": dto.user_id,
        "memberTypeId": dto.member_type_id,
    }));

    let created = ctx.load.store.insert(Table::Profile, row).await?;
    tracing::debug!(id = ?created.get("id"), "created profile");
    Ok(resolve(ctx, group, Table::Profile, created, path).await)
}

/// Apply a partial update; a missing row is an error
async fn change<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    table: Table,
    id: &str,
    patch: Row,
    path: Path,
) -> Result<Value> {
    let updated = ctx
        .load
        .store
        .update(table, id, patch)
        .await?
        .ok_or_else(|| not_found(table, id))?;
    Ok(resolve(ctx, group, table, updated, path).await)
}

/// Delete a user after its profile, posts and subscription edges
async fn delete_user<'a>(ctx: &'a ExecutionContext<'a>, field: &'a Field<'a, String>) -> Result<Value> {
    let id = utils::uuid_arg(field, "id", &ctx.variables)?;
    let store = &ctx.load.store;

    let profiles = store
        .delete(Table::Profile, &RowFilter::eq("userId", id.as_str()))
        .await?;
    let posts = store
        .delete(Table::Post, &RowFilter::eq("authorId", id.as_str()))
        .await?;
    let mut edges = 0;
    for column in ["subscriberId", "authorId"] {
        edges += store
            .delete(Table::SubscribersOnAuthors, &RowFilter::eq(column, id.as_str()))
            .await?;
    }
    let users = store.delete(Table::User, &RowFilter::eq("id", id.as_str())).await?;

    tracing::debug!(%id, users, profiles, posts, edges, "deleted user");
    Ok(if users > 0 { json!(id) } else { Value::Null })
}

async fn delete_by_id<'a>(
    ctx: &'a ExecutionContext<'a>,
    field: &'a Field<'a, String>,
    table: Table,
) -> Result<Value> {
    let id = utils::uuid_arg(field, "id", &ctx.variables)?;
    let removed = ctx
        .load
        .store
        .delete(table, &RowFilter::eq("id", id.as_str()))
        .await?;
    Ok(if removed > 0 { json!(id) } else { Value::Null })
}

/// Make `userId` a subscriber of `authorId`; returns the subscriber
async fn subscribe_to<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    path: Path,
) -> Result<Value> {
    let field = group.field;
    let user_id = utils::uuid_arg(field, "userId", &ctx.variables)?;
    let author_id = utils::uuid_arg(field, "authorId", &ctx.variables)?;
    let subscriber = find_existing(ctx, Table::User, &user_id).await?;
    find_existing(ctx, Table::User, &author_id).await?;

    let edge = edge_filter(&user_id, &author_id);
    let existing = ctx.load.store.find(Table::SubscribersOnAuthors, &edge).await?;
    if existing.is_empty() {
        let row = to_row(json!({ "subscriberId": user_id, "authorId": author_id }));
        ctx.load.store.insert(Table::SubscribersOnAuthors, row).await?;
    }

    Ok(resolve(ctx, group, Table::User, subscriber, path).await)
}

/// Remove the subscription edge; returns the author id, or null if none existed
async fn unsubscribe_from<'a>(
    ctx: &'a ExecutionContext<'a>,
    field: &'a Field<'a, String>,
) -> Result<Value> {
    let user_id = utils::uuid_arg(field, "userId", &ctx.variables)?;
    let author_id = utils::uuid_arg(field, "authorId", &ctx.variables)?;

    let removed = ctx
        .load
        .store
        .delete(Table::SubscribersOnAuthors, &edge_filter(&user_id, &author_id))
        .await?;
    Ok(if removed > 0 { json!(author_id) } else { Value::Null })
}

fn edge_filter(subscriber_id: &str, author_id: &str) -> RowFilter {
    RowFilter::eq("subscriberId", subscriber_id).and_eq("authorId", author_id)
}

async fn find_existing(ctx: &ExecutionContext<'_>, table: Table, id: &str) -> Result<Row> {
    let rows = ctx.load.store.find(table, &RowFilter::eq("id", id)).await?;
    rows.into_iter().next().ok_or_else(|| not_found(table, id))
}

fn not_found(table: Table, id: &str) -> anyhow::Error {
    EntityError::NotFound {
        entity_type: table.name().to_string(),
        id: id.to_string(),
    }
    .into()
}

async fn resolve<'a>(
    ctx: &'a ExecutionContext<'a>,
    group: &FieldGroup<'a>,
    table: Table,
    row: Row,
    path: Path,
) -> Value {
    let selection_sets = group.selection_sets.clone();
    field_resolver::resolve_object(ctx, table, Arc::new(row), selection_sets, path).await
}

fn to_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Columns present in a change input
fn to_patch(dto: &impl Serialize) -> Result<Row> {
    match serde_json::to_value(dto)? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow::anyhow!("Expected an input object, got {}", other)),
    }
}
