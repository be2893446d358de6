#![cfg(feature = "web")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::mpsc;
use tower::ServiceExt; // for oneshot

use meshstat::config::Config;
use meshstat::report::{DeviceIdentity, ReportComposer};
use meshstat::stats::clock::Clock;
use meshstat::stats::{self, SharedStats};
use meshstat::web::{router, WebState};

struct FixedClock;

impl Clock for FixedClock {
    fn now_epoch(&self) -> i64 {
        1_700_000_000
    }
}

fn test_state() -> (WebState, SharedStats, mpsc::UnboundedReceiver<()>) {
    let clock = Arc::new(FixedClock);
    let shared = stats::shared(clock);
    let config = Config::default();
    let composer = ReportComposer::new(DeviceIdentity::from_config(&config), shared.clone());
    let (restart_tx, restart_rx) = mpsc::unbounded_channel();
    (WebState::new(composer, shared.clone(), restart_tx), shared, restart_rx)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn test_index_serves_rendered_report() {
    let (state, _stats, _rx) = test_state();
    let response = router(state).oneshot(get("/")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let html = String::from_utf8(body.to_vec()).expect("utf-8");
    assert!(html.contains("<title>Meshstat Repeater</title>"));
    assert!(!html.contains("%TABLE%"), "placeholders must be expanded");
}

#[tokio::test]
async fn test_clear_resets_counters_and_redirects() {
    let (state, shared, _rx) = test_state();
    {
        let mut stats = stats::lock(&shared);
        stats.on_received(12);
        stats.on_sent(0, -37);
    }

    let response = router(state).oneshot(get("/clear")).await.expect("response");
    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers().get("location").and_then(|v| v.to_str().ok()),
        Some("/")
    );

    let stats = stats::lock(&shared);
    assert_eq!(stats.link(), Default::default());
    assert!(stats.peer(12).is_idle());
}

#[tokio::test]
async fn test_reboot_signals_restart() {
    let (state, _stats, mut restart_rx) = test_state();
    let response = router(state).oneshot(get("/reboot")).await.expect("response");
    assert!(response.status().is_redirection());
    assert!(restart_rx.try_recv().is_ok(), "restart intent must be queued");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (state, _stats, _rx) = test_state();
    let response = router(state).oneshot(get("/metrics")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
