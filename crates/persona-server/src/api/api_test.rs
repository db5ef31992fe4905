use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use persona_analysis::FeatureExtractor;
use persona_collector::{ActivityCollector, RedditClient};
use persona_core::RateLimitConfig;
use persona_store::RecordStore;
use persona_synth::{ConfidencePolicy, ProviderChain};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::middleware::PersonaRateLimiter;
use crate::pipeline::PersonaService;

fn service(reddit: &MockServer, output_dir: &std::path::Path) -> Arc<PersonaService> {
    let client =
        RedditClient::with_base_url(&reddit.uri(), 0, 0).expect("failed to build test client");
    Arc::new(PersonaService::new(
        ActivityCollector::with_client(client, Duration::ZERO),
        FeatureExtractor::default(),
        ProviderChain::new(ConfidencePolicy::default()),
        RecordStore::new(output_dir),
        2,
    ))
}

fn app(service: Arc<PersonaService>) -> Router {
    build_app(
        AppState { service },
        PersonaRateLimiter::from_config(&RateLimitConfig::default()),
    )
}

fn listing(children: Vec<Value>) -> Value {
    json!({ "kind": "Listing", "data": { "children": children, "after": null } })
}

async fn mount_user(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/user/{name}/about.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "t2",
            "data": { "name": name, "link_karma": 10, "comment_karma": 20, "created_utc": 1_500_000_000.0 }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/user/{name}/submitted.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![json!({
            "kind": "t3",
            "data": {
                "id": "p1",
                "name": "t3_p1",
                "subreddit": "rust",
                "title": "Finally shipped my first async crate",
                "selftext": "I love how tokio makes concurrent code pleasant to write.",
                "score": 42,
                "created_utc": 1_700_000_000.0,
                "permalink": "/r/rust/comments/p1/post/",
                "num_comments": 7
            }
        })])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/user/{name}/comments.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![json!({
            "kind": "t1",
            "data": {
                "id": "c1",
                "name": "t1_c1",
                "subreddit": "programming",
                "body": "Great write-up, thanks for sharing the benchmarks.",
                "score": 5,
                "created_utc": 1_700_050_000.0,
                "permalink": "/r/programming/comments/x/y/c1/"
            }
        })])))
        .mount(server)
        .await;
}

fn post_persona(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/personas")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("invalid_username", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("upstream_error", StatusCode::BAD_GATEWAY),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[tokio::test]
async fn health_reports_providers_and_echoes_request_id() {
    let reddit = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let response = app(service(&reddit, dir.path()))
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-health")
    );
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["providers"], json!([]));
    assert_eq!(json["data"]["cached_personas"], 0);
    assert_eq!(json["meta"]["request_id"], "req-health");
}

#[tokio::test]
async fn create_persona_falls_back_to_template_and_persists() {
    let reddit = MockServer::start().await;
    mount_user(&reddit, "spez").await;
    let dir = tempfile::tempdir().expect("tempdir");

    let response = app(service(&reddit, dir.path()))
        .oneshot(post_persona(&json!({ "username": "https://www.reddit.com/user/Spez/" })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["persona"]["username"], "spez");
    assert_eq!(json["persona"]["metadata"]["source"], "template");
    assert_eq!(json["persona"]["metadata"]["posts_analyzed"], 1);
    assert_eq!(json["persona"]["metadata"]["comments_analyzed"], 1);
    assert!(json["chart_data"].as_array().is_some_and(|c| !c.is_empty()));
    assert_eq!(json["attempts"][0]["provider_id"], "template");
    assert!(dir.path().join("spez_persona.json").exists());
}

#[tokio::test]
async fn create_persona_rejects_invalid_username() {
    let reddit = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let response = app(service(&reddit, dir.path()))
        .oneshot(post_persona(&json!({ "username": "no spaces allowed" })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "invalid_username");
    assert!(json["error"]
        .as_str()
        .is_some_and(|msg| msg.contains("no spaces allowed")));
}

#[tokio::test]
async fn create_persona_maps_unknown_account_to_not_found() {
    let reddit = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/ghost/about.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&reddit)
        .await;
    let dir = tempfile::tempdir().expect("tempdir");

    let response = app(service(&reddit, dir.path()))
        .oneshot(post_persona(&json!({ "username": "ghost" })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["code"], "not_found");
    assert!(json["error"].is_string());
    assert!(!dir.path().join("ghost_persona.json").exists());
}

#[tokio::test]
async fn create_persona_maps_reddit_throttling_to_429() {
    let reddit = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/busy/about.json"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
        .mount(&reddit)
        .await;
    let dir = tempfile::tempdir().expect("tempdir");

    let response = app(service(&reddit, dir.path()))
        .oneshot(post_persona(&json!({ "username": "busy" })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = json_body(response).await;
    assert_eq!(json["code"], "rate_limited");
}

#[tokio::test]
async fn get_persona_serves_cache_after_create() {
    let reddit = MockServer::start().await;
    mount_user(&reddit, "spez").await;
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(service(&reddit, dir.path()));

    let created = app
        .clone()
        .oneshot(post_persona(&json!({ "username": "spez" })))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/v1/personas/u%2FSpez"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["persona"]["username"], "spez");
    assert!(json.get("profile").is_some());
}

#[tokio::test]
async fn get_persona_falls_back_to_stored_record() {
    let reddit = MockServer::start().await;
    mount_user(&reddit, "spez").await;
    let dir = tempfile::tempdir().expect("tempdir");

    let created = app(service(&reddit, dir.path()))
        .oneshot(post_persona(&json!({ "username": "spez" })))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::OK);

    // A fresh service has an empty cache but shares the output directory.
    let response = app(service(&reddit, dir.path()))
        .oneshot(get("/api/v1/personas/spez"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["persona"]["username"], "spez");
    assert!(json.get("profile").is_none());
}

#[tokio::test]
async fn get_persona_without_record_is_not_found() {
    let reddit = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let response = app(service(&reddit, dir.path()))
        .oneshot(get("/api/v1/personas/nobody_here"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_persona_invalidates_cached_entry() {
    let reddit = MockServer::start().await;
    mount_user(&reddit, "spez").await;
    let dir = tempfile::tempdir().expect("tempdir");
    let service = service(&reddit, dir.path());
    let app = app(Arc::clone(&service));

    let created = app
        .clone()
        .oneshot(post_persona(&json!({ "username": "spez" })))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::OK);
    assert_eq!(service.cache().len().await, 1);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/personas/spez")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["username"], "spez");
    assert_eq!(json["data"]["invalidated"], true);
    assert!(service.cache().is_empty().await);
}

#[tokio::test]
async fn persona_routes_enforce_rate_limit() {
    let reddit = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let app = build_app(
        AppState {
            service: service(&reddit, dir.path()),
        },
        PersonaRateLimiter::from_config(&RateLimitConfig {
            max_requests: 1,
            window_secs: 60,
        }),
    );

    let first = app
        .clone()
        .oneshot(get("/api/v1/personas/someone"))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::NOT_FOUND);

    let second = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/personas/someone")
                .header("x-request-id", "req-limited")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = second
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("retry-after header");
    assert!((1..=60).contains(&retry_after));
    let json = json_body(second).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "rate_limited");
    assert!(json["error"].is_string());
    assert_eq!(json["meta"]["request_id"], "req-limited");

    // health is outside the persona budget
    let health = app.oneshot(get("/api/v1/health")).await.expect("response");
    assert_eq!(health.status(), StatusCode::OK);
}
