//! Event Collector API Server
//!
//! Receives drowsiness alerts from detectors, stores their snapshots and
//! serves the most recent events to dashboard consumers.

use axum::{extract::State, response::IntoResponse, routing::{get, post}, Json, Router};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
pub mod routes;

pub use config::CollectorConfig;
pub use error::ApiError;

use storage::{EventStore, SnapshotStore, StorageError};

/// Application state shared across handlers
pub struct AppState {
    /// Recent event history
    pub events: EventStore,
    /// Decoded snapshot files
    pub snapshots: SnapshotStore,
    /// Root served under `/static`
    pub static_dir: PathBuf,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state, creating the snapshot directory
    pub fn new(config: &CollectorConfig) -> Result<Self, StorageError> {
        Ok(Self {
            events: EventStore::new(config.history_capacity),
            snapshots: SnapshotStore::open(config.snapshot_dir())?,
            static_dir: config.static_dir.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        })
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub event_count: usize,
    pub event_capacity: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/alert", post(routes::alerts::submit_alert))
        .route("/snapshots_list", get(routes::alerts::list_events))
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        event_count: state.events.len(),
        event_capacity: state.events.capacity(),
    })
}

/// Initialize logging (`RUST_LOG` overrides the default `info` level)
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Run the server
pub async fn run_server(config: CollectorConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(&config)?);
    let app = create_router(state);

    info!("Starting event collector on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
