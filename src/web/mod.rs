//! HTTP report surface.
//!
//! Thin I/O boundary over the report composer: one document endpoint, a
//! counter-reset endpoint, and a restart endpoint. Everything else is 404.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use log::{debug, info, warn};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::report::ReportComposer;
use crate::stats::{self, SharedStats};

/// State shared by the HTTP handlers.
#[derive(Clone)]
pub struct WebState {
    composer: ReportComposer,
    stats: SharedStats,
    restart: mpsc::UnboundedSender<()>,
}

impl WebState {
    pub fn new(
        composer: ReportComposer,
        stats: SharedStats,
        restart: mpsc::UnboundedSender<()>,
    ) -> Self {
        Self { composer, stats, restart }
    }
}

/// Build the report router: `/`, `/clear`, `/reboot`, 404 for the rest.
pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/clear", get(clear))
        .route("/reboot", get(reboot))
        .fallback(not_found)
        .with_state(state)
}

/// Bind and serve the report surface until the process exits.
pub async fn serve(bind: &str, state: WebState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("web report surface on http://{}", bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index(State(state): State<WebState>) -> Html<String> {
    debug!("HTTP '/'");
    Html(state.composer.render_report())
}

async fn clear(State(state): State<WebState>) -> Redirect {
    info!("HTTP '/clear'");
    stats::lock(&state.stats).reset();
    Redirect::to("/")
}

async fn reboot(State(state): State<WebState>) -> Redirect {
    info!("HTTP '/reboot'");
    if state.restart.send(()).is_err() {
        warn!("restart requested but the node loop is gone");
    }
    Redirect::to("/")
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
