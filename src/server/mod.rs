use crate::recorder::{FrameHub, RecordingManager};
use crate::vod::VodComposer;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod error;
pub mod routes;

pub use error::AppError;

/// Where the recording tree is served, so composed VOD playlists are playable.
pub const RECORD_MOUNT: &str = "/record";

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    /// `None` when the recording capability failed to start
    pub recorder: Option<RecordingManager>,
    pub vod: VodComposer,
    /// Root of the recording tree
    pub base_path: PathBuf,
    /// In-process stream source the recorder subscribes to
    pub hub: FrameHub,
}

impl AppContext {
    /// The recorder, or a 503 error when recording is disabled.
    pub fn recorder(&self) -> std::result::Result<&RecordingManager, AppError> {
        self.recorder.as_ref().ok_or_else(AppError::recorder_disabled)
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let record_dir = ServeDir::new(&ctx.base_path);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes::api_routes())
        .nest_service(RECORD_MOUNT, record_dir)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check(State(ctx): State<AppContext>) -> impl IntoResponse {
    let sessions = ctx.recorder.as_ref().map(|r| r.registry().len()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "recording_enabled": ctx.recorder.is_some(),
            "sessions": sessions,
            "published_streams": ctx.hub.streams().len(),
        })),
    )
}

/// Serve `ctx` on `host:port` until a shutdown signal arrives.
pub async fn start_server(host: &str, port: u16, ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
