//! Shared fixtures for the GraphQL integration tests
//!
//! The fixture graph:
//!
//! - users `ALICE`, `BOB`, `CAROL`
//! - posts `ALICE_POST_1`, `ALICE_POST_2` by Alice, `BOB_POST` by Bob
//! - profiles for Alice (basic) and Bob (business); Carol has none
//! - subscriptions Bob -> Alice, Carol -> Alice, Alice -> Bob

#![allow(dead_code)]

use axum_test::TestServer;
use member_graph::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

pub const ALICE: &str = "a1a1a1a1-0000-4000-8000-000000000001";
pub const BOB: &str = "b2b2b2b2-0000-4000-8000-000000000002";
pub const CAROL: &str = "c3c3c3c3-0000-4000-8000-000000000003";

pub const ALICE_POST_1: &str = "d4d4d4d4-0000-4000-8000-000000000004";
pub const ALICE_POST_2: &str = "e5e5e5e5-0000-4000-8000-000000000005";
pub const BOB_POST: &str = "f6f6f6f6-0000-4000-8000-000000000006";

pub const ALICE_PROFILE: &str = "a7a7a7a7-0000-4000-8000-000000000007";
pub const BOB_PROFILE: &str = "b8b8b8b8-0000-4000-8000-000000000008";

pub const MISSING: &str = "99999999-0000-4000-8000-000000000099";

fn row(value: Value) -> Row {
    value.as_object().cloned().expect("fixture rows are objects")
}

/// Insert the fixture graph into any store
pub async fn seed(store: &dyn Store) {
    let users = [(ALICE, "Alice", 100.0), (BOB, "Bob", 50.5), (CAROL, "Carol", 0.0)];
    for (id, name, balance) in users {
        store
            .insert(Table::User, row(json!({ "id": id, "name": name, "balance": balance })))
            .await
            .expect("seed user");
    }

    let posts = [
        (ALICE_POST_1, "Hello", "First post", ALICE),
        (ALICE_POST_2, "Again", "Second post", ALICE),
        (BOB_POST, "Bob here", "Only post", BOB),
    ];
    for (id, title, content, author) in posts {
        store
            .insert(
                Table::Post,
                row(json!({ "id": id, "title": title, "content": content, "authorId": author })),
            )
            .await
            .expect("seed post");
    }

    let profiles = [
        (ALICE_PROFILE, true, 1990, ALICE, "basic"),
        (BOB_PROFILE, false, 1985, BOB, "business"),
    ];
    for (id, is_male, year, user, tier) in profiles {
        store
            .insert(
                Table::Profile,
                row(json!({
                    "id": id,
                    "isMale": is_male,
                    "yearOfBirth": year,
                    "userId": user,
                    "memberTypeId": tier,
                })),
            )
            .await
            .expect("seed profile");
    }

    let edges = [(BOB, ALICE), (CAROL, ALICE), (ALICE, BOB)];
    for (subscriber, author) in edges {
        store
            .insert(
                Table::SubscribersOnAuthors,
                row(json!({ "subscriberId": subscriber, "authorId": author })),
            )
            .await
            .expect("seed subscription");
    }
}

/// In-memory store holding the member tiers and the fixture graph
pub async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new().with_member_types();
    seed(&store).await;
    store
}

/// Test server over a shared store
pub fn server_for(store: Arc<dyn Store>) -> TestServer {
    let app = ServerBuilder::new()
        .with_shared_store(store)
        .build()
        .expect("Failed to build app");
    TestServer::new(app).expect("Failed to create test server")
}

/// Test server over a freshly seeded in-memory store
pub async fn seeded_server() -> (TestServer, InMemoryStore) {
    let store = seeded_store().await;
    let server = server_for(Arc::new(store.clone()));
    (server, store)
}

/// POST a document to `/graphql` and return the response body
pub async fn graphql(server: &TestServer, query: &str) -> Value {
    graphql_with(server, query, json!({})).await
}

/// POST a document with variables to `/graphql` and return the response body
pub async fn graphql_with(server: &TestServer, query: &str, variables: Value) -> Value {
    let response = server
        .post("/graphql")
        .json(&json!({ "query": query, "variables": variables }))
        .await;
    response.assert_status_ok();
    response.json()
}

/// Error entries of a response, empty when there are none
pub fn errors(body: &Value) -> Vec<Value> {
    body.get("errors")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Ids of a list of objects, sorted
pub fn sorted_ids(list: &Value) -> Vec<String> {
    let mut ids: Vec<String> = list
        .as_array()
        .expect("expected a list")
        .iter()
        .filter_map(|item| item["id"].as_str().map(str::to_string))
        .collect();
    ids.sort();
    ids
}
