//! Request pipeline: every request yields one log record and one metric pair.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::task::JoinSet;
use tower::ServiceExt;

use common::{capture_logs, test_router};

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn get_req(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

fn completed(records: &[Value]) -> Vec<&Value> {
    records
        .iter()
        .filter(|r| r["message"] == "request completed")
        .collect()
}

async fn boom() -> &'static str {
    panic!("handler exploded")
}

async fn missing() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "no such item")
}

async fn plain() -> &'static str {
    "plain text"
}

#[tokio::test]
async fn ping_logs_once_and_counts_once() {
    let (logs, _guard) = capture_logs();
    let (router, _) = test_router(Router::new());

    let (status, _, body) = call(&router, get_req("/ping")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "pong");
    assert!(chrono::DateTime::parse_from_rfc3339(body["time"].as_str().unwrap()).is_ok());

    let records = logs.records();
    let ping_lines: Vec<_> = records.iter().filter(|r| r["url.path"] == "/ping").collect();
    assert_eq!(ping_lines.len(), 1);
    let line = ping_lines[0];
    assert_eq!(line["http.response.status_code"], 200);
    assert_eq!(line["http.request.method"], "GET");
    assert_eq!(line["service.name"], "orchestrated-ping");
    assert!(line["event.duration"].is_u64());
    assert!(line["trace.id"].as_str().is_some_and(|id| !id.is_empty()));

    let (_, _, metrics) = call(&router, get_req("/metrics")).await;
    let metrics = String::from_utf8(metrics).unwrap();
    assert!(metrics.contains(r#"http_requests_total{method="GET",endpoint="/ping",status="200"} 1"#));
    assert!(metrics.contains(r#"http_request_duration_seconds_count{method="GET",endpoint="/ping",status="200"} 1"#));
}

#[tokio::test]
async fn logged_bytes_match_body_length() {
    let (logs, _guard) = capture_logs();
    let (router, _) = test_router(Router::new());

    let (_, _, body) = call(&router, get_req("/ready")).await;

    let records = logs.records();
    let line = completed(&records)[0];
    assert_eq!(line["http.response.body.bytes"], body.len() as u64);
}

#[tokio::test]
async fn panicking_handler_is_recovered_and_still_instrumented() {
    let (logs, _guard) = capture_logs();
    let (router, metrics) = test_router(Router::new().route("/boom", get(boom)));

    let request = Request::get("/boom")
        .header("x-request-id", "req-panic")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = call(&router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "error");

    let records = logs.records();
    let panics: Vec<_> = records.iter().filter(|r| r["message"] == "handler panicked").collect();
    assert_eq!(panics.len(), 1);
    assert_eq!(panics[0]["log.level"], "ERROR");
    assert_eq!(panics[0]["error.message"], "handler exploded");
    assert_eq!(panics[0]["trace.id"], "req-panic");

    let done = completed(&records);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0]["http.response.status_code"], 500);

    assert!(metrics
        .snapshot()
        .contains(r#"http_requests_total{method="GET",endpoint="/boom",status="500"} 1"#));

    let (status, _, _) = call(&router, get_req("/ping")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn explicit_status_is_recorded() {
    let (logs, _guard) = capture_logs();
    let (router, metrics) = test_router(Router::new().route("/items/{id}", get(missing)));

    let (status, _, _) = call(&router, get_req("/items/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let records = logs.records();
    let line = completed(&records)[0];
    assert_eq!(line["http.response.status_code"], 404);
    assert_eq!(line["url.path"], "/items/42");

    let snapshot = metrics.snapshot();
    assert!(snapshot.contains(r#"http_requests_total{method="GET",endpoint="/items/{id}",status="404"} 1"#));
    assert!(!snapshot.contains("/items/42"));
}

#[tokio::test]
async fn status_defaults_to_200() {
    let (logs, _guard) = capture_logs();
    let (router, _) = test_router(Router::new().route("/plain", get(plain)));

    call(&router, get_req("/plain")).await;

    let records = logs.records();
    assert_eq!(completed(&records)[0]["http.response.status_code"], 200);
}

#[tokio::test]
async fn unmatched_routes_share_one_label() {
    let (router, metrics) = test_router(Router::new());

    for path in ["/a", "/b/c", "/d?x=1"] {
        let (status, _, _) = call(&router, get_req(path)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    assert!(metrics
        .snapshot()
        .contains(r#"http_requests_total{method="GET",endpoint="unmatched",status="404"} 3"#));
}

#[tokio::test]
async fn correlation_id_and_client_address_are_logged() {
    let (logs, _guard) = capture_logs();
    let (router, _) = test_router(Router::new());

    let request = Request::get("/health")
        .header("x-request-id", "abc-123")
        .header("x-forwarded-for", "198.51.100.4, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = call(&router, request).await;
    assert_eq!(headers["x-request-id"], "abc-123");

    let records = logs.records();
    let line = completed(&records)[0];
    assert_eq!(line["trace.id"], "abc-123");
    assert_eq!(line["client.address"], "198.51.100.4");
}

#[tokio::test]
async fn concurrent_requests_are_all_counted() {
    const N: usize = 64;
    let (router, metrics) = test_router(Router::new());

    let mut tasks = JoinSet::new();
    for _ in 0..N {
        let router = router.clone();
        tasks.spawn(async move {
            let response = router.oneshot(get_req("/ping")).await.unwrap();
            response.into_body().collect().await.unwrap();
        });
    }
    while let Some(done) = tasks.join_next().await {
        done.unwrap();
    }

    assert!(metrics
        .snapshot()
        .contains(&format!(r#"http_requests_total{{method="GET",endpoint="/ping",status="200"}} {N}"#)));
}
