use std::time::Duration;
use tracing::Span;

use axum::extract::State;
use axum::http::{Request, Response, StatusCode};
use axum::routing::{get, post};
use axum::{response::IntoResponse, Router};
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::ingest::handler::upload;
use crate::metrics;
use crate::readiness::shutdown_signal;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(render_metrics))
        .route("/upload/:partition_key", post(upload))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    tracing::info_span!(
                      "http_request",
                      method = %req.method(),
                      path = %req.uri().path(),
                    )
                })
                .on_response(|res: &Response<_>, latency: Duration, _span: &Span| {
                    tracing::info!(
                      status = %res.status(),
                      latency_ms = %latency.as_millis(),
                      "response"
                    )
                })
                .on_failure(|_error: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                    tracing::warn!(latency_ms = %latency.as_millis(), "request_failed");
                }),
        )
        .with_state(state)
}

/// Serves until a shutdown signal arrives and the drain period has passed.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let listener: TcpListener = TcpListener::bind(state.cfg.http.bind).await?;
    println!("listening on {}", listener.local_addr()?);

    let ready = state.ready.clone();
    let drain = state.cfg.shutdown_drain();
    ready.set_ready(true);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(ready, drain))
        .await?;
    Ok(())
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn readyz(State(st): State<AppState>) -> impl IntoResponse {
    if st.ready.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn render_metrics(State(st): State<AppState>) -> impl IntoResponse {
    match metrics::render(&st.registry) {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => {
            tracing::error!(error = %err, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}
