//! Member API example
//!
//! Serves the GraphQL API over an in-memory store seeded with a few users,
//! posts, profiles and subscriptions.
//!
//! ```sh
//! cargo run --example member_api
//! curl -s localhost:8000/graphql -H 'content-type: application/json' \
//!   -d '{"query":"{ users { name posts { title } subscribedToUser { name } } }"}'
//! ```
//!
//! Set `MEMBER_GRAPH_CONFIG` to load a YAML config file instead of the defaults.
//! With the `postgres` feature and a `database_url` in that file, the server
//! runs against PostgreSQL instead.

use member_graph::prelude::*;
use member_graph::server::telemetry::init_tracing;
use serde_json::json;

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

async fn seed(store: &InMemoryStore) -> Result<()> {
    let alice = Uuid::new_v4().to_string();
    let bob = Uuid::new_v4().to_string();
    let carol = Uuid::new_v4().to_string();

    for (id, name, balance) in [(&alice, "Alice", 120.0), (&bob, "Bob", 40.0), (&carol, "Carol", 5.5)] {
        store
            .insert(Table::User, row(json!({ "id": id, "name": name, "balance": balance })))
            .await?;
    }

    let posts = [
        (&alice, "Batching", "One round trip per field"),
        (&alice, "Scopes", "One batcher per field occurrence"),
        (&bob, "Hello", "First post"),
    ];
    for (author, title, content) in posts {
        store
            .insert(
                Table::Post,
                row(json!({
                    "id": Uuid::new_v4().to_string(),
                    "title": title,
                    "content": content,
                    "authorId": author,
                })),
            )
            .await?;
    }

    for (user, year, tier) in [(&alice, 1990, "business"), (&bob, 1987, "basic")] {
        store
            .insert(
                Table::Profile,
                row(json!({
                    "id": Uuid::new_v4().to_string(),
                    "isMale": false,
                    "yearOfBirth": year,
                    "userId": user,
                    "memberTypeId": tier,
                })),
            )
            .await?;
    }

    for (subscriber, author) in [(&bob, &alice), (&carol, &alice), (&alice, &bob)] {
        store
            .insert(
                Table::SubscribersOnAuthors,
                row(json!({ "subscriberId": subscriber, "authorId": author })),
            )
            .await?;
    }

    tracing::info!(alice = %alice, bob = %bob, carol = %carol, "seeded demo data");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::var("MEMBER_GRAPH_CONFIG") {
        Ok(path) => ServerConfig::from_yaml_file(&path)?,
        Err(_) => ServerConfig::default(),
    };
    init_tracing(&config.log_filter)?;

    #[cfg(feature = "postgres")]
    if let Some(url) = config.database_url.clone() {
        let store = PostgresStore::connect(&url).await?;
        member_graph::storage::postgres::ensure_schema(store.pool()).await?;
        store.seed_member_types().await?;
        tracing::info!("using PostgreSQL store");

        return ServerBuilder::new()
            .with_store(store)
            .with_config(config)
            .serve_configured()
            .await;
    }

    let store = InMemoryStore::new().with_member_types();
    seed(&store).await?;

    tracing::info!("GraphQL endpoint: http://{}/graphql", config.bind_address);
    tracing::info!("Schema: http://{}/graphql/schema", config.bind_address);

    ServerBuilder::new()
        .with_store(store)
        .with_config(config)
        .serve_configured()
        .await
}
