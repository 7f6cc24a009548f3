//! Integration test: the HTTP front end end-to-end.
//!
//! Scale the pool through the API and check that routing responses stay
//! in line with the ring behind it.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use keel_http::HttpServer;
use keel_integration_tests::{balancer_with, churn_config};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn call(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn scale(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn routed(request_id: u64) -> Request<Body> {
    Request::builder()
        .uri("/home")
        .header("x-request-id", request_id.to_string())
        .body(Body::empty())
        .unwrap()
}

async fn server_for(app: &axum::Router, request_id: u64) -> String {
    let (status, body) = call(app, routed(request_id)).await;
    assert_eq!(status, StatusCode::OK);
    body["message"]["server"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_scale_and_route_through_api() {
    let balancer = balancer_with(&churn_config(), 0).await;
    let app = HttpServer::new(balancer).into_router();

    // Nothing to route to yet.
    let (status, _) = call(&app, routed(1)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = call(&app, scale("POST", "/add", json!({"n": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["N"], 3);

    let mut before = Vec::new();
    for rid in 0..300 {
        before.push(server_for(&app, rid).await);
    }

    let (status, body) = call(
        &app,
        scale("DELETE", "/rm", json!({"n": 1, "hostnames": ["server-2"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["replicas"], json!(["server-1", "server-3"]));

    for (rid, old) in before.iter().enumerate() {
        let now = server_for(&app, rid as u64).await;
        if old != "server-2" {
            assert_eq!(&now, old, "request {rid} moved off a surviving server");
        } else {
            assert_ne!(now, "server-2");
        }
    }

    let (status, body) = call(
        &app,
        Request::builder().uri("/rep").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["N"], 2);

    // The last server cannot be removed.
    let (status, body) = call(&app, scale("DELETE", "/rm", json!({"n": 2}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failure");
}
