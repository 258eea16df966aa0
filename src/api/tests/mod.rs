use super::*;
use crate::test_helpers::RecordingMessenger;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;


/// Relay with a recording messenger and default settings
fn test_relay() -> (Relay, Arc<Config>) {
    let config = Arc::new(Config::default());
    let relay = Relay::new((*config).clone(), Arc::new(RecordingMessenger::new())).unwrap();
    (relay, config)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn server_stops_on_cancel() {
    let (relay, config) = test_relay();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();

    let server = tokio::spawn(serve(listener, relay, config, cancel.clone()));

    let body: serde_json::Value = reqwest::get(format!("http://{}/health", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn bind_failure_is_io_error() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (relay, config) = test_relay();
    let mut config = (*config).clone();
    config.api.host = "127.0.0.1".parse().unwrap();
    config.api.port = taken.local_addr().unwrap().port();

    let result = start_api_server(relay, Arc::new(config), CancellationToken::new()).await;

    assert!(matches!(result, Err(crate::Error::Io(_))));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (relay, config) = test_relay();
    let response = create_router(relay, config)
        .oneshot(Request::builder().uri("/downloads").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn debug_router_still_serves() {
    let (relay, config) = test_relay();
    let mut config = (*config).clone();
    config.api.debug = true;

    let (status, body) = get_json(create_router(relay, Arc::new(config)), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
