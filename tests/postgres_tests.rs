//! Integration tests for the PostgreSQL store
//!
//! # Requirements
//!
//! - Docker must be running (testcontainers launches a PostgreSQL container)
//! - Feature flag `postgres` must be enabled
//!
//! # Running
//!
//! ```sh
//! cargo test --features postgres --test postgres_tests -- --test-threads=1
//! ```
//!
//! All tests share a single PostgreSQL container (via `OnceLock`). Each test
//! creates a fresh `PgPool` and truncates the tables before running.

#![cfg(feature = "postgres")]

mod graph_harness;

use graph_harness::*;
use member_graph::prelude::*;
use member_graph::storage::postgres::ensure_schema;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::{Arc, OnceLock};
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

// ---------------------------------------------------------------------------
// Shared test environment (single container, fresh pool per test)
// ---------------------------------------------------------------------------

/// Keeps the container alive for the whole test binary
struct PgTestEnv {
    _container: testcontainers::ContainerAsync<Postgres>,
    connection_url: String,
}

static TEST_ENV: OnceLock<PgTestEnv> = OnceLock::new();

async fn init_pg_env() -> &'static PgTestEnv {
    if let Some(env) = TEST_ENV.get() {
        return env;
    }

    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start PostgreSQL container, is Docker running?");

    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to PostgreSQL");
    ensure_schema(&pool).await.expect("Failed to apply schema");
    pool.close().await;

    let _ = TEST_ENV.set(PgTestEnv {
        _container: container,
        connection_url: url,
    });
    TEST_ENV.get().unwrap()
}

async fn pg_pool() -> PgPool {
    let env = init_pg_env().await;
    PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&env.connection_url)
        .await
        .expect("Failed to connect to PostgreSQL")
}

/// Store over truncated tables, holding the member tiers and the fixture graph
async fn seeded_pg_store() -> PostgresStore {
    let pool = pg_pool().await;
    sqlx::query(r#"TRUNCATE "SubscribersOnAuthors", "Post", "Profile", "User", "MemberType" CASCADE"#)
        .execute(&pool)
        .await
        .expect("Failed to truncate tables");

    let store = PostgresStore::new(pool);
    store
        .seed_member_types()
        .await
        .expect("Failed to seed member types");
    seed(&store).await;
    store
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

mod store_tests {
    use super::*;

    #[tokio::test]
    async fn test_find_by_key_set() {
        let store = seeded_pg_store().await;

        let posts = store
            .find(
                Table::Post,
                &RowFilter::is_in("authorId", vec![ALICE.to_string(), CAROL.to_string()]),
            )
            .await
            .expect("find posts");
        let mut ids: Vec<String> = posts
            .iter()
            .filter_map(|r| r["id"].as_str().map(str::to_string))
            .collect();
        ids.sort();
        assert_eq!(ids, vec![ALICE_POST_1.to_string(), ALICE_POST_2.to_string()]);
        assert_eq!(posts[0]["authorId"], ALICE);
    }

    #[tokio::test]
    async fn test_find_with_second_column_equality() {
        let store = seeded_pg_store().await;

        let edge = RowFilter::eq("subscriberId", BOB).and_eq("authorId", ALICE);
        assert_eq!(
            store
                .find(Table::SubscribersOnAuthors, &edge)
                .await
                .expect("find edge")
                .len(),
            1
        );

        let none = RowFilter::eq("subscriberId", BOB).and_eq("authorId", CAROL);
        assert!(
            store
                .find(Table::SubscribersOnAuthors, &none)
                .await
                .expect("find edge")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_find_through_pairs_rows_with_owners() {
        let store = seeded_pg_store().await;
        let join = JoinSpec {
            table: Table::SubscribersOnAuthors,
            owner_column: "authorId",
            target_column: "subscriberId",
        };

        let linked = store
            .find_through(Table::User, &join, &[ALICE.to_string(), BOB.to_string()])
            .await
            .expect("find through");

        let owners_of = |id: &str| {
            let mut owners = linked
                .iter()
                .find(|l| l.row["id"] == id)
                .map(|l| l.owners.clone())
                .unwrap_or_default();
            owners.sort();
            owners
        };
        assert_eq!(owners_of(BOB), vec![ALICE.to_string()]);
        assert_eq!(owners_of(CAROL), vec![ALICE.to_string()]);
        assert_eq!(owners_of(ALICE), vec![BOB.to_string()]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = seeded_pg_store().await;

        let mut patch = Row::new();
        patch.insert("balance".into(), json!(7.5));
        let updated = store
            .update(Table::User, BOB, patch)
            .await
            .expect("update")
            .expect("row exists");
        assert_eq!(updated["balance"], 7.5);
        assert_eq!(updated["name"], "Bob");

        assert!(
            store
                .update(Table::User, MISSING, Row::new())
                .await
                .expect("update")
                .is_none()
        );

        let removed = store
            .delete(Table::Post, &RowFilter::eq("authorId", ALICE))
            .await
            .expect("delete");
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn test_unknown_column_is_rejected() {
        let store = seeded_pg_store().await;

        let result = store
            .find(Table::User, &RowFilter::eq("password", "x"))
            .await;
        assert!(result.is_err());
    }
}

// ---------------------------------------------------------------------------
// GraphQL over PostgreSQL
// ---------------------------------------------------------------------------

mod graphql_tests {
    use super::*;

    #[tokio::test]
    async fn test_nested_query() {
        let server = server_for(Arc::new(seeded_pg_store().await));

        let body = graphql(
            &server,
            "{ users { id posts { id author { id } } profile { memberType { id } } subscribedToUser { id } } }",
        )
        .await;
        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);

        let users = body["data"]["users"].as_array().expect("users");
        let alice = users.iter().find(|u| u["id"] == ALICE).expect("alice");
        assert_eq!(
            sorted_ids(&alice["posts"]),
            vec![ALICE_POST_1.to_string(), ALICE_POST_2.to_string()]
        );
        assert_eq!(alice["posts"][0]["author"]["id"], ALICE);
        assert_eq!(alice["profile"]["memberType"]["id"], "basic");
        assert_eq!(
            sorted_ids(&alice["subscribedToUser"]),
            vec![BOB.to_string(), CAROL.to_string()]
        );

        let carol = users.iter().find(|u| u["id"] == CAROL).expect("carol");
        assert_eq!(carol["profile"], Value::Null);
    }

    #[tokio::test]
    async fn test_mutations() {
        let server = server_for(Arc::new(seeded_pg_store().await));

        let created = graphql(
            &server,
            &format!(
                r#"mutation {{ createPost(dto: {{ title: "PG", content: "body", authorId: "{}" }}) {{ id author {{ name }} }} }}"#,
                CAROL
            ),
        )
        .await;
        assert!(errors(&created).is_empty(), "unexpected errors: {}", created);
        assert_eq!(created["data"]["createPost"]["author"]["name"], "Carol");

        let deleted = graphql(&server, &format!(r#"mutation {{ deleteUser(id: "{}") }}"#, ALICE)).await;
        assert!(errors(&deleted).is_empty(), "unexpected errors: {}", deleted);
        assert_eq!(deleted["data"]["deleteUser"], ALICE);

        let remaining = graphql(&server, "{ posts { id } profiles { id } }").await;
        assert_eq!(remaining["data"]["posts"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            sorted_ids(&remaining["data"]["profiles"]),
            vec![BOB_PROFILE.to_string()]
        );
    }
}
