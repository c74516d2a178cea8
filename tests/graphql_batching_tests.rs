//! End-to-end tests of batched relation loading through `POST /graphql`
//!
//! Each relation field occurrence must cost exactly one store round trip,
//! however many parent objects request it.

mod graph_harness;

use graph_harness::*;
use member_graph::prelude::{InMemoryStore, Row, Store, Table};
use serde_json::{Value, json};
use std::sync::Arc;

/// Run `query` and return the body together with the round trips it cost
async fn measured(query: &str) -> (Value, usize) {
    let (server, store) = seeded_server().await;
    let before = store.round_trips();
    let body = graphql(&server, query).await;
    (body, store.round_trips() - before)
}

mod round_trip_tests {
    use super::*;

    #[tokio::test]
    async fn test_one_to_many_costs_one_round_trip() {
        let (body, trips) = measured("{ users { id posts { id } } }").await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        // users + posts
        assert_eq!(trips, 2);

        let users = body["data"]["users"].as_array().expect("users list");
        assert_eq!(users.len(), 3);
        for user in users {
            let expected: Vec<String> = match user["id"].as_str() {
                Some(ALICE) => vec![ALICE_POST_1.into(), ALICE_POST_2.into()],
                Some(BOB) => vec![BOB_POST.into()],
                _ => vec![],
            };
            assert_eq!(sorted_ids(&user["posts"]), expected);
        }
    }

    #[tokio::test]
    async fn test_every_relation_field_costs_one_round_trip() {
        let query = r#"{
            users {
                id
                profile { id memberType { id discount } }
                posts { id }
            }
        }"#;
        let (body, trips) = measured(query).await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        // users + profile + memberType + posts
        assert_eq!(trips, 4);

        let users = body["data"]["users"].as_array().expect("users list");
        let carol = users
            .iter()
            .find(|u| u["id"] == CAROL)
            .expect("carol present");
        assert_eq!(carol["profile"], Value::Null);

        let bob = users.iter().find(|u| u["id"] == BOB).expect("bob present");
        assert_eq!(bob["profile"]["memberType"]["id"], "business");
        assert_eq!(bob["profile"]["memberType"]["discount"], 7.7);
    }

    #[tokio::test]
    async fn test_aliased_occurrences_are_batched_separately() {
        let query = "{ users { first: posts { id } second: posts { title } } }";
        let (body, trips) = measured(query).await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        // users + one round trip per alias
        assert_eq!(trips, 3);

        let alice = body["data"]["users"]
            .as_array()
            .and_then(|users| users.iter().find(|u| u["first"].as_array().map(Vec::len) == Some(2)))
            .expect("alice's posts under the first alias");
        assert_eq!(alice["second"].as_array().map(Vec::len), Some(2));
        assert!(alice["second"][0]["title"].is_string());
    }

    #[tokio::test]
    async fn test_nested_relations_batch_per_level() {
        let query = "{ posts { id author { id posts { id } } } }";
        let (body, trips) = measured(query).await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        // posts + author + author.posts
        assert_eq!(trips, 3);

        let posts = body["data"]["posts"].as_array().expect("posts list");
        let alice_authors: Vec<&Value> = posts
            .iter()
            .filter(|p| p["author"]["id"] == ALICE)
            .map(|p| &p["author"])
            .collect();
        assert_eq!(alice_authors.len(), 2);
        // The shared author key yields the same author for both posts
        assert_eq!(alice_authors[0], alice_authors[1]);
        assert_eq!(
            sorted_ids(&alice_authors[0]["posts"]),
            vec![ALICE_POST_1.to_string(), ALICE_POST_2.to_string()]
        );
    }

    #[tokio::test]
    async fn test_subscription_edges_cost_one_round_trip_each() {
        let query = "{ users { id userSubscribedTo { id } subscribedToUser { id } } }";
        let (body, trips) = measured(query).await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        // users + userSubscribedTo + subscribedToUser
        assert_eq!(trips, 3);

        let users = body["data"]["users"].as_array().expect("users list");
        let by_id = |id: &str| users.iter().find(|u| u["id"] == id).expect("user present");

        assert_eq!(sorted_ids(&by_id(ALICE)["userSubscribedTo"]), vec![BOB.to_string()]);
        assert_eq!(
            sorted_ids(&by_id(ALICE)["subscribedToUser"]),
            vec![BOB.to_string(), CAROL.to_string()]
        );
        assert_eq!(sorted_ids(&by_id(CAROL)["userSubscribedTo"]), vec![ALICE.to_string()]);
        assert!(sorted_ids(&by_id(CAROL)["subscribedToUser"]).is_empty());
    }

    #[tokio::test]
    async fn test_fragment_fields_share_the_fragment_scope() {
        let query = r#"
            query { users { ...UserPosts } }
            fragment UserPosts on User { posts { id } }
        "#;
        let (body, trips) = measured(query).await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        assert_eq!(trips, 2);
    }

    #[tokio::test]
    async fn test_repeated_response_key_resolves_once() {
        let (body, trips) = measured("{ users { posts { id } posts { id } } }").await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        assert_eq!(trips, 2);
    }

    #[tokio::test]
    async fn test_repeated_relation_merges_its_selections() {
        let (body, trips) = measured("{ users { id posts { id } posts { title } } }").await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        // users + posts, the second `posts` joins the first scope
        assert_eq!(trips, 2);

        let users = body["data"]["users"].as_array().expect("users list");
        let bob = users
            .iter()
            .find(|u| u["id"] == BOB)
            .expect("Bob is listed");
        assert_eq!(bob["posts"], json!([{ "id": BOB_POST, "title": "Bob here" }]));
    }

    #[tokio::test]
    async fn test_repeated_root_field_merges_its_selections() {
        let query = format!(
            r#"{{ user(id: "{alice}") {{ id }} user(id: "{alice}") {{ name }} }}"#,
            alice = ALICE
        );
        let (body, trips) = measured(&query).await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        assert_eq!(trips, 1);
        assert_eq!(body["data"]["user"], json!({ "id": ALICE, "name": "Alice" }));
    }

    #[tokio::test]
    async fn test_wide_parent_list_costs_one_round_trip_per_level() {
        let store = InMemoryStore::new().with_member_types();
        for i in 0..100u32 {
            let user_id = format!("{:08x}-0000-4000-8000-000000000001", i);
            let mut user = Row::new();
            user.insert("id".into(), json!(user_id));
            user.insert("name".into(), json!(format!("user-{}", i)));
            user.insert("balance".into(), json!(0.0));
            store.insert(Table::User, user).await.expect("insert user");

            let mut profile = Row::new();
            profile.insert("id".into(), json!(format!("{:08x}-0000-4000-8000-000000000002", i)));
            profile.insert("isMale".into(), json!(i % 3 == 0));
            profile.insert("yearOfBirth".into(), json!(1950 + i));
            profile.insert("userId".into(), json!(user_id));
            let tier = if i % 2 == 0 { "basic" } else { "business" };
            profile.insert("memberTypeId".into(), json!(tier));
            store.insert(Table::Profile, profile).await.expect("insert profile");
        }
        let server = server_for(Arc::new(store.clone()));

        let before = store.round_trips();
        let body = graphql(&server, "{ users { id profile { memberType { id } } } }").await;
        let trips = store.round_trips() - before;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        // users + profile + memberType
        assert_eq!(trips, 3);

        let users = body["data"]["users"].as_array().expect("users list");
        assert_eq!(users.len(), 100);
        for user in users {
            let id = user["id"].as_str().expect("user id");
            let index = u32::from_str_radix(&id[..8], 16).expect("numbered id");
            let tier = if index % 2 == 0 { "basic" } else { "business" };
            assert_eq!(user["profile"]["memberType"]["id"], tier, "user {}", id);
        }
    }

    #[tokio::test]
    async fn test_batching_state_does_not_survive_the_request() {
        let (server, store) = seeded_server().await;
        let query = "{ users { posts { id } } }";

        let before = store.round_trips();
        let first = graphql(&server, query).await;
        let middle = store.round_trips();
        let second = graphql(&server, query).await;
        let after = store.round_trips();

        assert_eq!(first, second);
        assert_eq!(middle - before, 2);
        assert_eq!(after - middle, 2, "second request must not reuse cached rows");
    }

    #[tokio::test]
    async fn test_fresh_data_is_visible_to_the_next_request() {
        let (server, store) = seeded_server().await;
        let query = format!(r#"{{ user(id: "{}") {{ posts {{ id }} }} }}"#, CAROL);

        let before = graphql(&server, &query).await;
        assert!(sorted_ids(&before["data"]["user"]["posts"]).is_empty());

        let mut post = Row::new();
        post.insert("id".into(), json!(MISSING));
        post.insert("title".into(), json!("Late"));
        post.insert("content".into(), json!("..."));
        post.insert("authorId".into(), json!(CAROL));
        store
            .insert(Table::Post, post)
            .await
            .expect("insert post");

        let after = graphql(&server, &query).await;
        assert_eq!(sorted_ids(&after["data"]["user"]["posts"]), vec![MISSING.to_string()]);
    }
}

mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_root_lookup_by_id() {
        let query = format!(
            r#"{{ user(id: "{}") {{ name balance profile {{ yearOfBirth isMale }} }} }}"#,
            ALICE
        );
        let (body, trips) = measured(&query).await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        assert_eq!(trips, 2);
        assert_eq!(
            body["data"]["user"],
            json!({
                "name": "Alice",
                "balance": 100.0,
                "profile": { "yearOfBirth": 1990, "isMale": true }
            })
        );
    }

    #[tokio::test]
    async fn test_root_lookup_of_missing_row_is_null() {
        let query = format!(r#"{{ post(id: "{}") {{ id }} }}"#, MISSING);
        let (body, _) = measured(&query).await;

        assert!(errors(&body).is_empty());
        assert_eq!(body["data"]["post"], Value::Null);
    }

    #[tokio::test]
    async fn test_member_types_and_their_profiles() {
        let (body, trips) = measured("{ memberTypes { id postsLimitPerMonth profiles { id } } }").await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        assert_eq!(trips, 2);

        let tiers = body["data"]["memberTypes"].as_array().expect("tiers");
        let basic = tiers.iter().find(|t| t["id"] == "basic").expect("basic tier");
        assert_eq!(basic["postsLimitPerMonth"], 20);
        assert_eq!(sorted_ids(&basic["profiles"]), vec![ALICE_PROFILE.to_string()]);
    }

    #[tokio::test]
    async fn test_member_type_by_enum_id() {
        let (body, _) = measured("{ memberType(id: business) { id discount } }").await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        assert_eq!(body["data"]["memberType"], json!({ "id": "business", "discount": 7.7 }));
    }

    #[tokio::test]
    async fn test_root_subscription_lookups() {
        let query = format!(
            r#"{{
                followers: subscribedToUser(id: "{alice}") {{ id }}
                following: userSubscribedTo(id: "{alice}") {{ id }}
            }}"#,
            alice = ALICE
        );
        let (body, _) = measured(&query).await;

        assert!(errors(&body).is_empty(), "unexpected errors: {}", body);
        assert_eq!(
            sorted_ids(&body["data"]["followers"]),
            vec![BOB.to_string(), CAROL.to_string()]
        );
        assert_eq!(sorted_ids(&body["data"]["following"]), vec![BOB.to_string()]);
    }

    #[tokio::test]
    async fn test_variables_and_directives() {
        let (server, _) = seeded_server().await;
        let query = r#"
            query UserById($id: UUID!, $withPosts: Boolean = false) {
                user(id: $id) {
                    __typename
                    name
                    posts @include(if: $withPosts) { id }
                }
            }
        "#;

        let without = graphql_with(&server, query, json!({ "id": BOB })).await;
        assert_eq!(
            without["data"]["user"],
            json!({ "__typename": "User", "name": "Bob" })
        );

        let with = graphql_with(&server, query, json!({ "id": BOB, "withPosts": true })).await;
        assert_eq!(sorted_ids(&with["data"]["user"]["posts"]), vec![BOB_POST.to_string()]);
    }

    #[tokio::test]
    async fn test_operation_name_selects_the_operation() {
        let (server, _) = seeded_server().await;
        let response = server
            .post("/graphql")
            .json(&json!({
                "query": "query A { users { id } } query B { posts { id } }",
                "operationName": "B"
            }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert!(body["data"].get("users").is_none());
        assert_eq!(body["data"]["posts"].as_array().map(Vec::len), Some(3));
    }
}

mod endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoints() {
        let (server, _) = seeded_server().await;

        for path in ["/health", "/healthz"] {
            let response = server.get(path).await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["status"], "ok");
            assert_eq!(body["service"], "member-graph");
        }
    }

    #[tokio::test]
    async fn test_schema_endpoint_serves_sdl() {
        let (server, _) = seeded_server().await;

        let response = server.get("/graphql/schema").await;
        response.assert_status_ok();
        let sdl = response.text();
        assert!(sdl.contains("type User"));
        assert!(sdl.contains("subscribedToUser"));
    }
}
