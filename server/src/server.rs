//! axum server wiring.
//!
//! The server exposes:
//! - `POST /process-single`: sorts the batch with the [`SequentialProcessor`]
//! - `POST /process-concurrent`: sorts the batch with the [`ParallelProcessor`]
//! - `GET /healthz`
//!
//! Elapsed time is measured here, around the processor call, so the processors stay free of
//! timing concerns.

use std::{future::Future, sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    body::{to_bytes, Body},
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use http::{header, HeaderValue, Request, StatusCode};

use crate::{
    config::ServerConfig,
    model::{BatchLimits, LimitError, SortRequest, SortResponse},
    processor::{BatchProcessor, ParallelProcessor, ProcessError, SequentialProcessor, Strategy},
};

#[derive(Clone)]
struct AppState {
    single: Arc<dyn BatchProcessor>,
    concurrent: Arc<dyn BatchProcessor>,
    limits: BatchLimits,
    max_body_bytes: usize,
}

impl AppState {
    fn from_config(cfg: &ServerConfig) -> Self {
        Self {
            single: Arc::new(SequentialProcessor),
            concurrent: Arc::new(ParallelProcessor::new(cfg.max_parallel_workers)),
            limits: cfg.batch_limits(),
            max_body_bytes: cfg.max_body_bytes.map_or(usize::MAX, |n| n.get()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
/// Request failures, mapped to a plain-text HTTP response at the handler boundary.
pub enum ApiError {
    #[error("read body: {0}")]
    Body(axum::Error),

    #[error("decode request: {0}")]
    Decode(serde_json::Error),

    #[error(transparent)]
    Limit(#[from] LimitError),

    #[error("process batch: {0}")]
    Process(#[from] ProcessError),

    #[error("encode response: {0}")]
    Encode(serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(_) | Self::Decode(_) | Self::Limit(_) => StatusCode::BAD_REQUEST,
            Self::Process(_) | Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Build the application router for `cfg`.
pub fn router(cfg: &ServerConfig) -> Router {
    build_app(AppState::from_config(cfg))
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/process-single", post(process_single))
        .route("/process-concurrent", post(process_concurrent))
        .with_state(state)
}

/// Bind `cfg.listen_addr` and serve until Ctrl-C.
pub async fn run(cfg: ServerConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("bind {}", cfg.listen_addr))?;
    tracing::info!(listen_addr = %listener.local_addr()?, "listening");

    serve_listener(listener, &cfg, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    cfg: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, router(cfg))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::warn!(error = %err, "ctrl-c handler unavailable; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

async fn process_single(State(state): State<AppState>, req: Request<Body>) -> Response {
    respond(&state, state.single.as_ref(), req.into_body()).await
}

async fn process_concurrent(State(state): State<AppState>, req: Request<Body>) -> Response {
    respond(&state, state.concurrent.as_ref(), req.into_body()).await
}

async fn respond(state: &AppState, processor: &dyn BatchProcessor, body: Body) -> Response {
    let strategy = processor.strategy();
    match handle_batch(state, processor, body).await {
        Ok(res) => res,
        Err(err) => {
            if err.status().is_server_error() {
                tracing::warn!(
                    event = "batch_failed",
                    strategy = %strategy,
                    error = %err,
                    "batch failed"
                );
            } else {
                tracing::debug!(
                    event = "batch_rejected",
                    strategy = %strategy,
                    error = %err,
                    "batch rejected"
                );
            }
            err.into_response()
        }
    }
}

async fn handle_batch(
    state: &AppState,
    processor: &dyn BatchProcessor,
    body: Body,
) -> Result<Response, ApiError> {
    let bytes: Bytes = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(ApiError::Body)?;
    let request: SortRequest = serde_json::from_slice(&bytes).map_err(ApiError::Decode)?;
    state.limits.check(&request.to_sort)?;

    let batch = Arc::new(request.to_sort);
    let batch_len = batch.len();

    let started = Instant::now();
    let sorted_arrays = processor.process(batch).await?;
    let time_ns = elapsed_ns(started);

    log_processed(processor.strategy(), batch_len, time_ns);

    let body = serde_json::to_vec(&SortResponse {
        sorted_arrays,
        time_ns,
    })
    .map_err(ApiError::Encode)?;

    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        body,
    )
        .into_response())
}

fn elapsed_ns(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

fn log_processed(strategy: Strategy, batch_len: usize, time_ns: u64) {
    tracing::debug!(
        event = "batch_processed",
        strategy = %strategy,
        batch_len,
        time_ns,
        "batch processed"
    );
}
