// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The HTTP request surface (C7) and response compression (C8).
//!
//! Two routes are registered, both under the per-instance secret prefix
//! carried by the top-level `uuid` setting: `GET /<uuid>/search` and
//! `POST /<uuid>/search`. Everything else 404s. A match streams an
//! NDJSON body assembled by [`logrep_engine::Batcher`] from the search
//! worker's [`logrep_engine::Emission`]s, compressed with zstd via
//! `tower-http`'s negotiating `CompressionLayer`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::compression::predicate::SizeAbove;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{error, info, warn};

use logrep_core::{LogrepError, Settings};
use logrep_engine::constants::MINIMUM_SIZE;
use logrep_engine::{Batcher, Emission, SearchArgs};

use crate::config::{ConfigCache, DaemonConfig};
use crate::logging::effective_level;

#[derive(Clone)]
struct AppState {
    config: Arc<ConfigCache>,
}

/// The subset of Settings options a request is allowed to override, plus
/// the two fields that aren't Settings at all (`profile` picks which
/// Settings to layer onto; `files_with_matches` switches C5's mode).
#[derive(Deserialize, Debug, Default)]
struct SearchRequest {
    profile: Option<String>,
    discard_before: Option<String>,
    before_context: Option<String>,
    pattern: Option<String>,
    except_pattern: Option<String>,
    after_context: Option<String>,
    discard_after: Option<String>,
    #[serde(default)]
    files_with_matches: bool,
}

impl SearchRequest {
    fn overrides(&self) -> Result<Settings, LogrepError> {
        let mut overrides = Settings::default();
        for (name, value) in [
            ("discard_before", &self.discard_before),
            ("before_context", &self.before_context),
            ("pattern", &self.pattern),
            ("except_pattern", &self.except_pattern),
            ("after_context", &self.after_context),
            ("discard_after", &self.discard_after),
        ] {
            if let Some(value) = value {
                overrides.set_raw(name, value)?;
            }
        }
        Ok(overrides)
    }
}

struct AppError(LogrepError);

impl From<LogrepError> for AppError {
    fn from(err: LogrepError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.0.to_string()).into_response()
    }
}

async fn search_get(
    State(state): State<AppState>,
    Path(secret): Path<String>,
    Query(request): Query<SearchRequest>,
) -> Result<Response, AppError> {
    handle_search(&state, &secret, request).await
}

async fn search_post(
    State(state): State<AppState>,
    Path(secret): Path<String>,
    Json(request): Json<SearchRequest>,
) -> Result<Response, AppError> {
    handle_search(&state, &secret, request).await
}

async fn handle_search(
    state: &AppState,
    secret: &str,
    request: SearchRequest,
) -> Result<Response, AppError> {
    let top_level = state.config.effective(None)?;
    if top_level.uuid.as_deref() != Some(secret) {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    let profile_settings = state.config.effective(request.profile.as_deref())?;
    let overrides = request.overrides()?;
    let effective = profile_settings.overlay(&overrides);
    let files_with_matches = request.files_with_matches;
    let args = SearchArgs::from_settings(&effective, files_with_matches)?;

    let body = axum::body::Body::from_stream(search_stream(args));
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "application/x-ndjson")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

/// Runs the search on a blocking worker thread and turns its `Emission`s
/// into NDJSON-framed byte chunks, by way of a `Batcher`. Dropping the
/// returned stream (client disconnect) drops the byte channel, which in
/// turn drops the emission channel, which makes the worker's next
/// `blocking_send` fail and unwind the scan — no partial frame is ever
/// produced, since a frame is only handed out once `Batcher::feed` decides
/// it's complete.
fn search_stream(args: SearchArgs) -> ReceiverStream<Result<Bytes, std::io::Error>> {
    let (emission_tx, mut emission_rx) =
        mpsc::channel::<Emission>(logrep_engine::constants::RECORD_CHANNEL_CAPACITY);
    let (byte_tx, byte_rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(16);

    tokio::task::spawn_blocking(move || {
        if let Err(error) = logrep_engine::run_search(&args, &emission_tx) {
            error!(%error, "search worker failed");
        }
    });

    tokio::spawn(async move {
        let mut batcher = Batcher::new();
        while let Some(emission) = emission_rx.recv().await {
            if let Some(frame) = batcher.feed(emission) {
                if byte_tx.send(Ok(encode_frame(&frame))).await.is_err() {
                    return;
                }
            }
        }
        if let Some(frame) = batcher.finish() {
            let _ = byte_tx.send(Ok(encode_frame(&frame))).await;
        }
    });

    ReceiverStream::new(byte_rx)
}

fn encode_frame(frame: &logrep_core::Frame) -> Bytes {
    let mut body = serde_json::to_vec(frame).unwrap_or_default();
    body.push(b'\n');
    Bytes::from(body)
}

async fn fallback() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn create_router(state: AppState, span_level: tracing::Level) -> Router {
    let compression = CompressionLayer::new()
        .no_gzip()
        .no_br()
        .no_deflate()
        .zstd(true)
        .compress_when(SizeAbove::new(MINIMUM_SIZE as u16));
    Router::new()
        .route("/{secret}/search", get(search_get).post(search_post))
        .fallback(fallback)
        .layer(compression)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(span_level)))
        .with_state(state)
}

/// Binds and serves the HTTP request surface until a shutdown signal
/// arrives.
///
/// # Errors
///
/// Returns an error if the configured settings file can't be loaded, the
/// address can't be parsed, or the listener can't be bound.
pub async fn start_server(daemon_config: &DaemonConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = daemon_config.address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(daemon_config, listener).await
}

/// Serves the HTTP request surface on an already-bound listener, so tests
/// can bind to an ephemeral port and read back the one actually assigned.
///
/// # Errors
///
/// Returns an error if the configured settings file can't be loaded.
pub async fn serve(
    daemon_config: &DaemonConfig,
    listener: tokio::net::TcpListener,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(ConfigCache::load(&daemon_config.settings_path)?);
    let state = AppState { config };
    let app = create_router(state, effective_level(&daemon_config.log));

    info!(address = %listener.local_addr()?, "starting HTTP API server");

    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(%error, "failed to install Ctrl+C handler");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                },
                Err(error) => warn!(%error, "failed to install SIGTERM handler"),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => info!("received CTRL-C signal, initiating graceful shutdown"),
            () = terminate => info!("received SIGTERM signal, initiating graceful shutdown"),
        }
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn write_settings(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("logrep.toml");
        std::fs::write(&path, "uuid = \"secret-token\"\n\n[default]\npattern = \"four\"\n").unwrap();
        path
    }

    #[tokio::test]
    async fn unknown_secret_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = write_settings(dir.path());
        let config = Arc::new(ConfigCache::load(&settings_path).unwrap());
        let app = create_router(AppState { config }, tracing::Level::INFO);

        let response = app
            .oneshot(Request::builder().uri("/wrong-secret/search").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn other_paths_404() {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = write_settings(dir.path());
        let config = Arc::new(ConfigCache::load(&settings_path).unwrap());
        let app = create_router(AppState { config }, tracing::Level::INFO);

        let response = app
            .oneshot(Request::builder().uri("/unrelated").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
