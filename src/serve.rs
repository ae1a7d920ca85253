//! Purpose: Provide the HTTP sidecar exposing the transcoding pipeline.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based loopback server a Beacon API gateway calls per request/response.
//! Invariants: Transcoded bodies are returned verbatim with `application/json`.
//! Invariants: Errors use the `{message, code}` envelope with the kind's mapped status.
//! Invariants: Loopback-only unless explicitly allowed.
//! Notes: Hooks are synchronous; transcoding runs on the blocking pool.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;

use crate::route_info_json::{fork_json, routes_json};
use forkgate::api::{Error, ErrorKind, Pipeline};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub allow_non_loopback: bool,
    pub max_body_bytes: u64,
}

#[derive(Clone)]
struct AppState {
    pipeline: Pipeline,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    message: String,
    code: u16,
}

#[derive(Deserialize)]
struct RouteQuery {
    route: Option<String>,
}

#[derive(Deserialize)]
struct ForkQuery {
    slot: Option<String>,
}

pub async fn serve(config: ServeConfig, pipeline: Pipeline) -> Result<(), Error> {
    validate_config(&config)?;

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let app = router(AppState { pipeline }, max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    tracing::info!(bind = %config.bind, "listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutting down");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v0/routes", get(list_routes))
        .route("/v0/fork", get(fork_at_slot))
        .route("/v0/transcode/request", post(transcode_request))
        .route("/v0/transcode/response", post(transcode_response))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 8388608."));
    }

    if config.max_body_bytes > usize::MAX as u64 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes exceeds platform limits")
            .with_hint("Use a smaller value that fits in memory."));
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn list_routes(State(state): State<Arc<AppState>>) -> Response {
    Json(routes_json(state.pipeline.registry())).into_response()
}

async fn fork_at_slot(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForkQuery>,
) -> Response {
    let slot = match query.slot.as_deref().map(str::parse::<u64>) {
        Some(Ok(slot)) => slot,
        Some(Err(_)) => {
            return error_response(
                Error::new(ErrorKind::Usage)
                    .with_message("slot is not an unsigned integer")
                    .with_hint("Use ?slot=<u64>."),
            );
        }
        None => {
            return error_response(
                Error::new(ErrorKind::Usage)
                    .with_message("missing slot")
                    .with_hint("Use ?slot=<u64>."),
            );
        }
    };
    Json(fork_json(state.pipeline.registry().schedule(), slot)).into_response()
}

async fn transcode_request(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RouteQuery>,
    body: Bytes,
) -> Response {
    let route = match required_route(query) {
        Ok(route) => route,
        Err(err) => return error_response(err),
    };
    let pipeline = state.pipeline.clone();
    run_blocking(move || pipeline.transcode_request(&route, body)).await
}

async fn transcode_response(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RouteQuery>,
    body: Bytes,
) -> Response {
    let route = match required_route(query) {
        Ok(route) => route,
        Err(err) => return error_response(err),
    };
    let pipeline = state.pipeline.clone();
    run_blocking(move || pipeline.transcode_response(&route, &body)).await
}

fn required_route(query: RouteQuery) -> Result<String, Error> {
    match query.route {
        Some(route) if !route.is_empty() => Ok(route),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message("missing route")
            .with_hint("Use ?route=/eth/v1/... (see GET /v0/routes).")),
    }
}

async fn run_blocking<F>(work: F) -> Response
where
    F: FnOnce() -> Result<Bytes, Error> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(work).await.unwrap_or_else(|err| {
        Err(Error::new(ErrorKind::Internal)
            .with_message("transcoding task failed")
            .with_source(err))
    });
    match result {
        Ok(body) => json_body_response(body),
        Err(err) => error_response(err),
    }
}

fn json_body_response(body: Bytes) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn error_response(err: Error) -> Response {
    let status = err.http_status();
    let message = match err.message() {
        Some(message) => message.to_string(),
        None => format!("{:?}", err.kind()),
    };
    let body = ErrorEnvelope {
        message,
        code: status.as_u16(),
    };
    (status, Json(body)).into_response()
}
