//! Core GraphQL executor orchestration

use anyhow::Result;
use futures::future::join_all;
use graphql_parser::query::{
    Definition, Document, OperationDefinition, SelectionSet, VariableDefinition, parse_query,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use super::context::{ExecutionContext, child_path};
use super::field_resolver::collect_fields;
use super::utils;
use super::{mutation_executor, query_executor};
use crate::core::error::GraphQLError;
use crate::server::exposure::graphql::validation::{Fragments, check_depth};
use crate::server::host::ServerHost;

/// Body of a GraphQL request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    #[serde(default)]
    pub operation_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    fn root_type(self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
        }
    }
}

/// GraphQL executor running operations against the host's store
///
/// Each execution gets its own [`ExecutionContext`], and with it its own
/// scope registry: batching never spans two requests.
pub struct GraphQLExecutor {
    host: Arc<ServerHost>,
}

impl GraphQLExecutor {
    /// Create a new executor with the given host
    pub fn new(host: Arc<ServerHost>) -> Self {
        Self { host }
    }

    /// Execute a request body
    pub async fn execute_request(&self, request: &GraphQLRequest) -> Result<Value> {
        self.execute(
            &request.query,
            request.variables.clone(),
            request.operation_name.as_deref(),
        )
        .await
    }

    /// Execute a GraphQL document and return the response as JSON
    ///
    /// Errors raised before execution starts (parsing, operation selection,
    /// depth limit) are returned as `Err`. Errors of individual fields are
    /// reported in the `errors` array of the response.
    pub async fn execute(
        &self,
        query: &str,
        variables: Option<Map<String, Value>>,
        operation_name: Option<&str>,
    ) -> Result<Value> {
        let doc = parse_query::<String>(query).map_err(|e| GraphQLError::ParseError {
            message: e.to_string(),
        })?;

        let fragments: Fragments = doc
            .definitions
            .iter()
            .filter_map(|def| match def {
                Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
                Definition::Operation(_) => None,
            })
            .collect();

        let (kind, selection_set, definitions) = select_operation(&doc, operation_name)?;
        check_depth(selection_set, &fragments, self.host.config.max_query_depth)?;

        let variables = with_defaults(variables.unwrap_or_default(), definitions);
        let ctx = ExecutionContext::new(self.host.store.clone(), variables, fragments);

        let data = match kind {
            OperationKind::Query => execute_query(&ctx, selection_set).await,
            OperationKind::Mutation => execute_mutation(&ctx, selection_set).await,
        };

        let errors = ctx.take_errors();
        tracing::debug!(
            operation = kind.root_type(),
            scopes = ctx.load.scopes.len(),
            errors = errors.len(),
            "operation executed"
        );

        let mut response = json!({ "data": data });
        if !errors.is_empty() {
            response["errors"] = serde_json::to_value(errors)?;
        }
        Ok(response)
    }
}

type SelectedOperation<'d, 'a> = (
    OperationKind,
    &'d SelectionSet<'a, String>,
    &'d [VariableDefinition<'a, String>],
);

/// Pick the operation named `operation_name`, or the first one
fn select_operation<'d, 'a>(
    doc: &'d Document<'a, String>,
    operation_name: Option<&str>,
) -> Result<SelectedOperation<'d, 'a>, GraphQLError> {
    let mut operations = doc.definitions.iter().filter_map(|def| match def {
        Definition::Operation(op) => Some(op),
        Definition::Fragment(_) => None,
    });

    let operation = match operation_name {
        Some(name) => operations
            .find(|op| operation_name_of(op) == Some(name))
            .ok_or_else(|| GraphQLError::OperationNotFound {
                name: name.to_string(),
            })?,
        None => operations.next().ok_or_else(|| GraphQLError::OperationNotFound {
            name: "<anonymous>".to_string(),
        })?,
    };

    match operation {
        OperationDefinition::SelectionSet(set) => Ok((OperationKind::Query, set, &[])),
        OperationDefinition::Query(query) => Ok((
            OperationKind::Query,
            &query.selection_set,
            &query.variable_definitions,
        )),
        OperationDefinition::Mutation(mutation) => Ok((
            OperationKind::Mutation,
            &mutation.selection_set,
            &mutation.variable_definitions,
        )),
        OperationDefinition::Subscription(subscription) => Err(GraphQLError::InvalidOperation {
            operation: subscription.name.clone().unwrap_or_default(),
            message: "Subscriptions are not supported".to_string(),
        }),
    }
}

fn operation_name_of<'d>(op: &'d OperationDefinition<'_, String>) -> Option<&'d str> {
    match op {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(q) => q.name.as_deref(),
        OperationDefinition::Mutation(m) => m.name.as_deref(),
        OperationDefinition::Subscription(s) => s.name.as_deref(),
    }
}

/// Fill absent variables from their declared defaults
fn with_defaults(
    mut variables: Map<String, Value>,
    definitions: &[VariableDefinition<'_, String>],
) -> Map<String, Value> {
    for definition in definitions {
        if let Some(default) = &definition.default_value
            && !variables.contains_key(&definition.name)
        {
            let value = utils::gql_value_to_json(default, &Map::new());
            variables.insert(definition.name.clone(), value);
        }
    }
    variables
}

/// Execute a query operation; root fields resolve concurrently
async fn execute_query<'a>(
    ctx: &'a ExecutionContext<'a>,
    selection_set: &'a SelectionSet<'a, String>,
) -> Value {
    let groups = match collect_fields(ctx, OperationKind::Query.root_type(), &[selection_set]) {
        Ok(groups) => groups,
        Err(err) => {
            ctx.record_error(&Vec::new(), err.into());
            return Value::Null;
        }
    };

    let values = join_all(groups.iter().map(|group| async move {
        if group.field.name == "__typename" {
            return json!(OperationKind::Query.root_type());
        }
        let path = vec![json!(group.key())];
        match query_executor::resolve_query_field(ctx, group, path.clone()).await {
            Ok(value) => value,
            Err(err) => {
                ctx.record_error(&path, err);
                Value::Null
            }
        }
    }))
    .await;

    let mut result = Map::new();
    for (group, value) in groups.iter().zip(values) {
        result.insert(group.key().to_string(), value);
    }
    Value::Object(result)
}

/// Execute a mutation operation; root fields run one after the other
async fn execute_mutation<'a>(
    ctx: &'a ExecutionContext<'a>,
    selection_set: &'a SelectionSet<'a, String>,
) -> Value {
    let groups = match collect_fields(ctx, OperationKind::Mutation.root_type(), &[selection_set]) {
        Ok(groups) => groups,
        Err(err) => {
            ctx.record_error(&Vec::new(), err.into());
            return Value::Null;
        }
    };

    let mut result = Map::new();
    for group in &groups {
        let key = group.key();
        let value = if group.field.name == "__typename" {
            json!(OperationKind::Mutation.root_type())
        } else {
            let path = child_path(&Vec::new(), key);
            match mutation_executor::resolve_mutation_field(ctx, group, path.clone()).await {
                Ok(value) => value,
                Err(err) => {
                    ctx.record_error(&path, err);
                    Value::Null
                }
            }
        };
        result.insert(key.to_string(), value);
    }
    Value::Object(result)
}
