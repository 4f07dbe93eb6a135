//! Control-plane integration tests: real catalog on a tempdir, real git
//! clones over the local file transport, requests driven through the
//! router with `oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use git2::{Repository, Signature};
use slipway_core::catalog::Catalog;
use slipway_core::gitops::SshKey;
use slipway_core::intake::{admission_channel, AdmissionReceiver, Intake};
use slipway_server::state::AppState;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const API_KEY: &str = "test-api-key";

fn upstream_repo() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    repo.set_head("refs/heads/main").unwrap();

    std::fs::write(dir.path().join("package.json"), "{\"version\": \"0.1.0\"}").unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("package.json")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("dev", "dev@forge.local").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "chore: init", &tree, &[])
        .unwrap();

    let url = format!("file://{}", dir.path().display());
    (dir, url)
}

fn test_app(root: &Path) -> (axum::Router, AdmissionReceiver) {
    let catalog = Arc::new(Catalog::open(root, "origin", SshKey::unused()).unwrap());
    let (tx, rx) = admission_channel();
    let intake = Arc::new(Intake::new(catalog, tx));
    let app = slipway_server::build_router(AppState::new(intake, API_KEY));
    (app, rx)
}

fn create_body(name: &str, url: &str) -> String {
    serde_json::json!({
        "name": name,
        "git_ssh_url": url,
        "branch_name": "main",
        "npm_service": {
            "env_path": ".env",
            "containerfile_path": "Dockerfile",
            "compose_path": "."
        }
    })
    .to_string()
}

fn post_create(name: &str, url: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/services")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(create_body(name, url)))
        .unwrap()
}

fn get_with_key(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requests_without_api_key_are_unauthorized() {
    let root = TempDir::new().unwrap();
    let (app, _rx) = test_app(root.path());

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/services")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_api_key_is_unauthorized() {
    let root = TempDir::new().unwrap();
    let (app, _rx) = test_app(root.path());

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/services")
                .header("x-api-key", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let (_up, url) = upstream_repo();
    let root = TempDir::new().unwrap();
    let (app, mut rx) = test_app(root.path());

    let resp = app
        .clone()
        .oneshot(post_create("billing-api", &url))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await;
    assert_eq!(created["service"]["name"], "billing-api");
    assert!(created["service"]["id"].as_str().is_some());

    // A successful create admits exactly one token.
    let admitted = rx.recv().await.unwrap();
    assert_eq!(admitted.name, "billing-api");

    let resp = app
        .oneshot(get_with_key("/v1/services/billing-api"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = json_body(resp).await;
    assert_eq!(fetched["service"]["name"], "billing-api");
    assert_eq!(fetched["service"]["id"], created["service"]["id"]);
    assert_eq!(
        fetched["service"]["configuration"]["npm_service"]["containerfile_path"],
        "Dockerfile"
    );
}

#[tokio::test]
async fn duplicate_create_conflicts() {
    let (_up, url) = upstream_repo();
    let root = TempDir::new().unwrap();
    let (app, mut rx) = test_app(root.path());

    let resp = app
        .clone()
        .oneshot(post_create("billing-api", &url))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let _ = rx.recv().await.unwrap();

    let resp = app
        .oneshot(post_create("billing-api", &url))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(rx.try_recv().is_err(), "conflicting create must not admit");
}

#[tokio::test]
async fn zero_or_two_variants_are_bad_requests() {
    let (_up, url) = upstream_repo();
    let root = TempDir::new().unwrap();
    let (app, _rx) = test_app(root.path());

    let none = serde_json::json!({
        "name": "billing-api",
        "git_ssh_url": url,
        "branch_name": "main"
    });
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/services")
                .header("content-type", "application/json")
                .header("x-api-key", API_KEY)
                .body(Body::from(none.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let both = serde_json::json!({
        "name": "billing-api",
        "git_ssh_url": url,
        "branch_name": "main",
        "npm_service": {
            "env_path": ".env",
            "containerfile_path": "Dockerfile",
            "compose_path": "."
        },
        "openapi": { "spec_path": "openapi.yaml" }
    });
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/services")
                .header("content-type", "application/json")
                .header("x-api-key", API_KEY)
                .body(Body::from(both.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_service_is_not_found() {
    let root = TempDir::new().unwrap();
    let (app, _rx) = test_app(root.path());

    let resp = app
        .oneshot(get_with_key("/v1/services/ghost"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_pages_by_name_with_cursor() {
    let (_up, url) = upstream_repo();
    let root = TempDir::new().unwrap();
    let (app, mut rx) = test_app(root.path());

    for name in ["gamma", "alpha", "beta"] {
        let resp = app.clone().oneshot(post_create(name, &url)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let _ = rx.recv().await.unwrap();
    }

    let resp = app
        .clone()
        .oneshot(get_with_key("/v1/services?max_results=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page = json_body(resp).await;
    let names: Vec<_> = page["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["alpha", "beta"]);
    assert_eq!(page["next_token"], "beta");

    let resp = app
        .oneshot(get_with_key("/v1/services?max_results=2&next_token=beta"))
        .await
        .unwrap();
    let page = json_body(resp).await;
    let names: Vec<_> = page["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["gamma"]);
    assert_eq!(page["next_token"], serde_json::Value::Null);
}

#[tokio::test]
async fn invalid_name_is_a_bad_request() {
    let (_up, url) = upstream_repo();
    let root = TempDir::new().unwrap();
    let (app, _rx) = test_app(root.path());

    let resp = app
        .oneshot(post_create("Not A Name", &url))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
