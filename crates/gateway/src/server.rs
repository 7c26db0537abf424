use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        routing::{get, post},
    },
    mediaferry_media::cleanup,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use crate::{
    artifact_routes::download_handler,
    convert_routes::{convert_handler, health_handler},
    state::GatewayState,
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/convert", post(convert_handler))
        .route("/downloads/{filename}", get(download_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { gateway: state })
}

/// Purge leftovers from a previous run, then serve until the listener fails.
pub async fn start_gateway(bind: &str, port: u16, state: Arc<GatewayState>) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&state.downloads_dir).await?;
    if let Some(ttl) = state.unclaimed_ttl {
        match cleanup::purge_stale(&state.downloads_dir, ttl).await {
            Ok(0) => {},
            Ok(removed) => info!(removed, "removed stale artifacts from a previous run"),
            Err(e) => warn!(error = %e, "startup purge failed"),
        }
    }

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        downloads = %state.downloads_dir.display(),
        version = %state.version,
        "gateway listening"
    );

    let app = build_gateway_app(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
