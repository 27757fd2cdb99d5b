//! HTTP surface tests
//!
//! Requests go through the full router (state, layers, error mapping) with
//! `oneshot`, no socket involved.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use model_registry::api::{create_app, API_PREFIX};
use model_registry::core::factory::create_app_state;
use model_registry::Config;

fn app() -> Router {
    create_app(create_app_state(Config::default()).unwrap())
}

async fn send(app: &Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let uri = if path.starts_with('/') && !path.starts_with(API_PREFIX) && path != "/health" {
        format!("{}{}", API_PREFIX, path)
    } else {
        path.to_string()
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_model(app: &Router, name: &str) -> String {
    let (status, body) = send(app, Method::POST, "/registered_models", Some(json!({"name": name}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_and_get_registered_model() {
    let app = app();
    let id = create_model(&app, "MyAwesomeModel").await;
    assert_eq!(id, "1");

    let (status, body) = send(&app, Method::GET, "/registered_models/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "MyAwesomeModel");
    assert!(body["createTimeSinceEpoch"].is_string());

    let (status, body) = send(&app, Method::GET, "/registered_model?name=MyAwesomeModel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "1");
}

#[tokio::test]
async fn test_missing_entity_is_a_json_404() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/registered_models/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "Not Found");
    assert!(body["message"].as_str().unwrap().contains("99"));

    let (status, _) = send(&app, Method::GET, "/registered_models/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_version_is_a_conflict() {
    let app = app();
    let model = create_model(&app, "m").await;
    let path = format!("/registered_models/{}/versions", model);

    let (status, body) = send(&app, Method::POST, &path, Some(json!({"name": "v1"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["registeredModelId"], model.as_str());
    assert_eq!(body["name"], "v1");

    let (status, body) = send(&app, Method::POST, &path, Some(json!({"name": "v1"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "Conflict");
}

#[tokio::test]
async fn test_version_without_model_is_rejected() {
    let app = app();
    let (status, _) = send(&app, Method::POST, "/model_versions", Some(json!({"name": "v1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/model_versions",
        Some(json!({"name": "v1", "registeredModelId": "42"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_merges_onto_stored_entity() {
    let app = app();
    let (status, created) = send(
        &app,
        Method::POST,
        "/registered_models",
        Some(json!({"name": "m", "owner": "alice", "description": "first"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let path = format!("/registered_models/{}", created["id"].as_str().unwrap());

    let (status, patched) = send(
        &app,
        Method::PATCH,
        &path,
        Some(json!({"description": null, "state": "ARCHIVED", "name": "renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["owner"], "alice");
    assert_eq!(patched["state"], "ARCHIVED");
    assert_eq!(patched["name"], "m");
    assert!(patched.get("description").is_none());
}

#[tokio::test]
async fn test_artifacts_and_metric_history() {
    let app = app();
    let (_, experiment) = send(&app, Method::POST, "/experiments", Some(json!({"name": "exp"}))).await;
    let runs = format!("/experiments/{}/experiment_runs", experiment["id"].as_str().unwrap());
    let (status, run) = send(&app, Method::POST, &runs, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let run_id = run["id"].as_str().unwrap().to_string();

    let artifacts = format!("/experiment_runs/{}/artifacts", run_id);
    for step in [1, 2] {
        let metric = json!({"artifactType": "metric", "name": "accuracy", "step": step, "value": 0.5});
        let (status, body) = send(&app, Method::POST, &artifacts, Some(metric)).await;
        assert!(status.is_success());
        assert_eq!(body["artifactType"], "metric");
    }

    let (status, listed) = send(&app, Method::GET, &artifacts, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["size"], 1);

    let history = format!("/experiment_runs/{}/metric_history", run_id);
    let (_, all) = send(&app, Method::GET, &history, None).await;
    assert_eq!(all["size"], 2);

    let (_, filtered) = send(&app, Method::GET, &format!("{}?stepIds=1", history), None).await;
    assert_eq!(filtered["size"], 1);
    assert_eq!(filtered["items"][0]["step"], 1);
}

#[tokio::test]
async fn test_listing_pages() {
    let app = app();
    for name in ["a", "b", "c"] {
        create_model(&app, name).await;
    }

    let (status, first) = send(&app, Method::GET, "/registered_models?pageSize=2&orderBy=ID", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["size"], 2);
    let token = first["nextPageToken"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    let (_, rest) = send(
        &app,
        Method::GET,
        &format!("/registered_models?pageSize=2&orderBy=ID&nextPageToken={}", token),
        None,
    )
    .await;
    assert_eq!(rest["size"], 1);
    assert_eq!(rest["nextPageToken"], "");

    let (status, _) = send(&app, Method::GET, "/registered_models?pageSize=many", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = app();
    let (status, health) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["types_resolved"], true);

    create_model(&app, "counted").await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("registry_operations_total"));
}
