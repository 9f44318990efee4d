// crates/modvet-server/src/server.rs
// ============================================================================
// Module: modvet HTTP Server
// Description: Report, validate, and save endpoints over shared state.
// Purpose: Translate HTTP requests into store and dispatch queue calls.
// Dependencies: axum, modvet-config, modvet-core, modvet-dispatch, tokio
// ============================================================================

//! ## Overview
//! Three endpoints drive the system:
//! - `POST /api/report`: the validator reports a record for a package.
//! - `POST /api/validate`: claims a package and queues a validator run when
//!   the package is new.
//! - `GET|POST /api/save`: forces a snapshot.
//!
//! A background ticker snapshots the store every `save_interval_secs`; the
//! dirty flag turns clean ticks into no-ops and makes failed ticks retry.
//! Store I/O always runs on the blocking pool.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::any;
use axum::routing::get;
use axum::routing::post;
use modvet_config::ModvetConfig;
use modvet_core::AuditEvent;
use modvet_core::AuditSink;
use modvet_core::LogLevel;
use modvet_core::PackageKey;
use modvet_core::PackageStore;
use modvet_core::ValidationRecord;
use modvet_dispatch::CommandRunner;
use modvet_dispatch::DispatchQueue;
use modvet_dispatch::ProcessRunner;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// State shared by every handler.
pub struct AppState {
    /// Package validation store.
    pub store: Arc<PackageStore>,
    /// Validator dispatch queue.
    pub dispatch: Arc<DispatchQueue>,
    /// Destination for transport events.
    pub audit: Arc<dyn AuditSink>,
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

/// Builds the HTTP router over `state`.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_body_bytes.saturating_add(1);
    Router::new()
        .route("/api/report", post(handle_report))
        .route("/api/validate", any(handle_validate))
        .route("/api/save", get(handle_save).post(handle_save))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Body of `/api/report`.
#[derive(Debug, Deserialize)]
struct ReportRequest {
    /// Package the record belongs to.
    package: PackageKey,
    /// Validation outcome.
    data: ValidationRecord,
}

/// Body of `/api/validate`.
#[derive(Debug, Deserialize)]
struct ValidateRequest {
    /// Module path.
    #[serde(alias = "Module")]
    module: String,
    /// Module version.
    #[serde(alias = "Version")]
    version: String,
}

/// Success body of `/api/validate`.
#[derive(Debug, Serialize)]
struct ValidateResponse {
    /// Package key.
    package: String,
    /// Whether this request queued a validator run.
    queued: bool,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Stores a validation record reported by the validator.
async fn handle_report(State(state): State<Arc<AppState>>, bytes: Bytes) -> Response {
    if bytes.len() > state.max_body_bytes {
        return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
    }
    let report: ReportRequest = match serde_json::from_slice(&bytes) {
        Ok(report) => report,
        Err(err) => {
            state.audit.record(
                &AuditEvent::new("report_rejected", LogLevel::Warn).reason("bad_request").error(&err),
            );
            return (StatusCode::BAD_REQUEST, format!("invalid report: {err}")).into_response();
        }
    };
    state.audit.record(&AuditEvent::new("package_reported", LogLevel::Debug).package(&report.package));
    state.store.set_package_data(report.package, report.data);
    StatusCode::OK.into_response()
}

/// Claims a package and queues a validator run when it is new.
async fn handle_validate(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    if method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, "only POST is accepted").into_response();
    }
    if !is_json(&headers) {
        return (StatusCode::UNPROCESSABLE_ENTITY, "content-type must be application/json")
            .into_response();
    }
    if bytes.len() > state.max_body_bytes {
        return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
    }
    let request: ValidateRequest = match serde_json::from_slice(&bytes) {
        Ok(request) => request,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, format!("invalid validate request: {err}"))
                .into_response();
        }
    };
    let key = match PackageKey::new(&request.module, &request.version) {
        Ok(key) => key,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    let existed = state.store.ensure_package(&key);
    if !existed && let Err(err) = state.dispatch.start(key.module(), key.version()) {
        state.store.purge_package(&key);
        state.audit.record(
            &AuditEvent::new("validate_rejected", LogLevel::Warn).package(&key).error(&err),
        );
        return (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response();
    }
    Json(ValidateResponse {
        package: key.to_string(),
        queued: !existed,
    })
    .into_response()
}

/// Writes a snapshot on demand.
async fn handle_save(State(state): State<Arc<AppState>>) -> Response {
    match save_blocking(Arc::clone(&state.store)).await {
        Ok(()) => (StatusCode::OK, "Save complete").into_response(),
        Err(message) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error saving, {message}")).into_response()
        }
    }
}

/// Returns true when the request declares a JSON body.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Runs [`PackageStore::save`] on the blocking pool.
async fn save_blocking(store: Arc<PackageStore>) -> Result<(), String> {
    match tokio::task::spawn_blocking(move || store.save()).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(err) => Err(err.to_string()),
    }
}

// ============================================================================
// SECTION: Periodic Save
// ============================================================================

/// Spawns the snapshot ticker. The first snapshot happens one period in.
pub fn spawn_periodic_save(
    store: Arc<PackageStore>,
    period: Duration,
    audit: Arc<dyn AuditSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(message) = save_blocking(Arc::clone(&store)).await {
                audit.record(
                    &AuditEvent::new("periodic_save_failed", LogLevel::Warn).error(message),
                );
            }
        }
    })
}

// ============================================================================
// SECTION: Server Lifecycle
// ============================================================================

/// modvet HTTP server instance.
pub struct ModvetServer {
    /// Validated configuration.
    config: ModvetConfig,
    /// Handler state.
    state: Arc<AppState>,
}

impl ModvetServer {
    /// Builds a server that runs validators as real processes.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or the store or
    /// dispatch queue cannot start.
    pub fn from_config(config: ModvetConfig, audit: Arc<dyn AuditSink>) -> Result<Self, ServerError> {
        Self::with_runner(config, Arc::new(ProcessRunner), audit)
    }

    /// Builds a server with a custom command runner.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or the store or
    /// dispatch queue cannot start.
    pub fn with_runner(
        mut config: ModvetConfig,
        runner: Arc<dyn CommandRunner>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = PackageStore::open(&config.storage.data_dir, Arc::clone(&audit))
            .map_err(|err| ServerError::Init(err.to_string()))?;
        if let Err(err) = store.load_latest() {
            audit.record(
                &AuditEvent::new("store_load_latest_failed", LogLevel::Warn)
                    .path(&config.storage.data_dir)
                    .error(&err)
                    .message("starting with an empty store"),
            );
        }
        let dispatch = DispatchQueue::new(
            config.validator.clone(),
            config.dispatch,
            runner,
            Arc::clone(&audit),
        )
        .map_err(|err| ServerError::Init(err.to_string()))?;
        let state = Arc::new(AppState {
            store: Arc::new(store),
            dispatch: Arc::new(dispatch),
            audit,
            max_body_bytes: config.server.max_body_bytes,
        });
        Ok(Self {
            config,
            state,
        })
    }

    /// Returns the shared handler state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Binds the configured listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the address is invalid or in use.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr: SocketAddr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))
    }

    /// Serves on the configured address until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve_with(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Serves on `listener` until `shutdown` resolves, then flushes the store.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when serving or the final save fails.
    pub async fn serve_with<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = self.state();
        let ticker = spawn_periodic_save(
            Arc::clone(&state.store),
            self.config.storage.save_interval(),
            Arc::clone(&state.audit),
        );
        let mut started = AuditEvent::new("server_started", LogLevel::Info)
            .path(&self.config.storage.data_dir)
            .count(state.store.len());
        if let Ok(addr) = listener.local_addr() {
            started = started.message(format!("listening on {addr}"));
        }
        state.audit.record(&started);

        let app = build_router(Arc::clone(&state));
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")));
        ticker.abort();

        let flushed = save_blocking(Arc::clone(&state.store))
            .await
            .map_err(|message| ServerError::Transport(format!("final save failed: {message}")));
        state.audit.record(&AuditEvent::new("server_stopped", LogLevel::Info));
        served?;
        flushed
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// modvet server errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
