//! End-to-end tests for the version listing endpoints, driven through
//! the axum router against an in-memory store.

use std::sync::Arc;

use accord_api::api_router;
use accord_core::{
  deployment::NewDeployment,
  pact::NewPact,
  store::BrokerStore,
  version::NewVersion,
};
use accord_store_sqlite::{QueryCounter, SqliteStore};
use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

const BASE_URL: &str = "http://broker.test";

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn router(store: &SqliteStore) -> Router {
  api_router(Arc::new(store.clone()), BASE_URL)
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
  let response = router
    .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
    .await
    .unwrap();
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, body)
}

fn embedded_versions(body: &Value) -> &Vec<Value> {
  body["_embedded"]["versions"].as_array().expect("versions array")
}

fn version_numbers(body: &Value) -> Vec<&str> {
  embedded_versions(body)
    .iter()
    .map(|v| v["number"].as_str().unwrap())
    .collect()
}

/// Foo: versions 1, 2, 4 on "main", 3 on "foo". Bar: version 1 on "main".
async fn seed_branchy_consumers(s: &SqliteStore) {
  s.create_pacticipant("Foo").await.unwrap();
  for (number, branch) in [("1", "main"), ("2", "main"), ("3", "foo"), ("4", "main")] {
    s.create_version(NewVersion::new("Foo", number).on_branch(branch))
      .await
      .unwrap();
  }
  s.create_pacticipant("Bar").await.unwrap();
  s.create_version(NewVersion::new("Bar", "1").on_branch("main"))
    .await
    .unwrap();
}

// ─── Plain listings ──────────────────────────────────────────────────────────

#[tokio::test]
async fn branch_listing_returns_members_without_a_page_section() {
  let s = store().await;
  seed_branchy_consumers(&s).await;

  let (status, body) =
    get_json(router(&s), "/pacticipants/Foo/branches/main/versions").await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(version_numbers(&body), ["1", "2", "4"]);
  assert!(body.get("page").is_none());
}

#[tokio::test]
async fn unpaged_listing_returns_every_version() {
  let s = store().await;
  seed_branchy_consumers(&s).await;

  let (status, body) = get_json(router(&s), "/pacticipants/Foo/versions").await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(version_numbers(&body), ["1", "2", "3", "4"]);
  assert_eq!(body["_links"]["pb:versions"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn listing_a_pacticipant_without_versions_returns_an_empty_array() {
  let s = store().await;
  s.create_pacticipant("Lonely").await.unwrap();

  let (status, body) =
    get_json(router(&s), "/pacticipants/Lonely/versions").await;

  assert_eq!(status, StatusCode::OK);
  assert!(embedded_versions(&body).is_empty());
}

// ─── Pagination ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn paged_branch_listing_carries_page_and_next() {
  let s = store().await;
  seed_branchy_consumers(&s).await;

  let (status, body) = get_json(
    router(&s),
    "/pacticipants/Foo/branches/main/versions?size=2&page=1",
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(version_numbers(&body), ["1", "2"]);
  assert_eq!(body["page"]["pageNumber"], 1);
  assert_eq!(body["page"]["pageSize"], 2);
  assert_eq!(body["page"]["total"], 3);
  assert_eq!(body["page"]["totalPages"], 2);
  assert!(body["_links"].get("next").is_some());
  assert!(body["_links"].get("prev").is_none());
}

#[tokio::test]
async fn the_last_page_has_prev_but_no_next() {
  let s = store().await;
  seed_branchy_consumers(&s).await;

  let (_, body) = get_json(
    router(&s),
    "/pacticipants/Foo/branches/main/versions?pageNumber=2&pageSize=2",
  )
  .await;

  assert_eq!(version_numbers(&body), ["4"]);
  assert!(body["_links"].get("next").is_none());
  assert!(body["_links"].get("prev").is_some());
}

#[tokio::test]
async fn non_numeric_pagination_input_is_a_400() {
  let s = store().await;
  seed_branchy_consumers(&s).await;

  let (status, body) =
    get_json(router(&s), "/pacticipants/Foo/versions?pageSize=lots").await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body.get("error").is_some());
  assert!(body.get("_embedded").is_none());
}

// ─── Tag listings with deployment links ──────────────────────────────────────

#[tokio::test]
async fn tagged_version_carries_its_active_deployed_environment_links() {
  let s = store().await;
  s.create_pacticipant("Boo").await.unwrap();
  s.create_version(NewVersion::new("Boo", "1.2.3").tagged("prod"))
    .await
    .unwrap();
  s.create_environment("test").await.unwrap();
  s.create_environment("prod").await.unwrap();
  for environment in ["test", "prod"] {
    s.record_deployment(NewDeployment {
      pacticipant: "Boo".into(),
      version:     "1.2.3".into(),
      environment: environment.into(),
      target:      None,
    })
    .await
    .unwrap();
  }

  let (status, body) =
    get_json(router(&s), "/pacticipants/Boo/tags/prod/versions").await;

  assert_eq!(status, StatusCode::OK);
  let versions = embedded_versions(&body);
  assert_eq!(versions.len(), 1);
  assert_eq!(versions[0]["number"], "1.2.3");
  let deployed = versions[0]["_links"]["pb:deployed-environments"]
    .as_array()
    .unwrap();
  assert_eq!(deployed.len(), 2);
}

// ─── Not-found surfaces ──────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_pacticipant_is_a_404() {
  let s = store().await;
  let (status, body) =
    get_json(router(&s), "/pacticipants/Ghost/versions").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body.get("_embedded").is_none());
}

#[tokio::test]
async fn unknown_branch_is_a_404_with_no_partial_body() {
  let s = store().await;
  seed_branchy_consumers(&s).await;

  let (status, body) =
    get_json(router(&s), "/pacticipants/Foo/branches/cat/versions").await;

  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body.get("error").is_some());
  assert!(body.get("_embedded").is_none());
}

#[tokio::test]
async fn unknown_tag_is_a_404() {
  let s = store().await;
  seed_branchy_consumers(&s).await;

  let (status, _) =
    get_json(router(&s), "/pacticipants/Foo/tags/feature_tag/versions").await;

  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Latest pact for a branch ────────────────────────────────────────────────

#[tokio::test]
async fn latest_branch_pact_is_served_from_the_newest_publishing_member() {
  let s = store().await;
  s.create_pacticipant("Consumer").await.unwrap();
  for (number, branch) in [("1", "main"), ("2", "main"), ("3", "foo"), ("4", "main")] {
    s.create_version(NewVersion::new("Consumer", number).on_branch(branch))
      .await
      .unwrap();
  }
  for (version, content) in [
    ("1", json!({ "interactions": [] })),
    ("2", json!({ "interactions": [{ "description": "a request for an alligator" }] })),
    ("3", json!({ "interactions": [{ "description": "wrong branch" }] })),
  ] {
    s.publish_pact(NewPact {
      consumer:         "Consumer".into(),
      consumer_version: version.into(),
      provider:         "Provider".into(),
      content,
    })
    .await
    .unwrap();
  }

  let (status, body) = get_json(
    router(&s),
    "/pacts/provider/Provider/consumer/Consumer/branch/main/latest",
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["interactions"].as_array().unwrap().len(), 1);
  assert_eq!(
    body["interactions"][0]["description"],
    "a request for an alligator"
  );
  let self_href = body["_links"]["self"]["href"].as_str().unwrap();
  assert!(self_href.ends_with("/version/2"), "{self_href}");
}

#[tokio::test]
async fn latest_branch_pact_for_an_unknown_branch_is_a_404() {
  let s = store().await;
  s.create_pacticipant("Consumer").await.unwrap();
  s.create_version(NewVersion::new("Consumer", "1").on_branch("main"))
    .await
    .unwrap();
  s.publish_pact(NewPact {
    consumer:         "Consumer".into(),
    consumer_version: "1".into(),
    provider:         "Provider".into(),
    content:          json!({ "interactions": [] }),
  })
  .await
  .unwrap();

  let (status, body) = get_json(
    router(&s),
    "/pacts/provider/Provider/consumer/Consumer/branch/cat/latest",
  )
  .await;

  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body.get("error").is_some());
}

// ─── Query budget over HTTP ──────────────────────────────────────────────────

#[tokio::test]
async fn a_dense_listing_request_stays_within_the_query_budget() {
  let counter = QueryCounter::new();
  let s = store().await.with_observer(counter.clone());

  s.create_pacticipant("PerfConsumer").await.unwrap();
  for i in 1..=50u32 {
    s.create_version(
      NewVersion::new("PerfConsumer", i.to_string())
        .tagged("prod")
        .tagged("test")
        .tagged("staging"),
    )
    .await
    .unwrap();
    for provider in ["Provider1", "Provider2", "Provider3", "Provider4"] {
      s.publish_pact(NewPact {
        consumer:         "PerfConsumer".into(),
        consumer_version: i.to_string(),
        provider:         provider.into(),
        content:          json!({ "interactions": [i, provider] }),
      })
      .await
      .unwrap();
    }
  }

  counter.reset();
  let (status, body) = get_json(
    router(&s),
    "/pacticipants/PerfConsumer/versions?pageNumber=1&pageSize=20",
  )
  .await;
  let queries = counter.count();

  assert_eq!(status, StatusCode::OK);
  let versions = embedded_versions(&body);
  assert_eq!(versions.len(), 20);
  let pact_links: usize = versions
    .iter()
    .map(|v| v["_links"]["pb:pact-versions"].as_array().unwrap().len())
    .sum();
  assert_eq!(pact_links, 80);
  assert!(queries < 25, "expected fewer than 25 queries, got {queries}");
}
