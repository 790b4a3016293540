use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::devices::DeviceStatus;
use crate::devices::Registry;

/// Query string pairs shared by the /device/* endpoints
type DeviceQuery = Query<Vec<(String, String)>>;

/// Pick the device id out of the query string
///
/// The first `id` wins when it is repeated. A missing `id` is treated as the
/// empty id, which is never registered.
fn device_id(params: &[(String, String)]) -> &str {
    params
        .iter()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.as_str())
        .unwrap_or_default()
}

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
    devices: usize,
}

/// Entry in the /devices listing
#[derive(Serialize)]
struct DeviceSummary {
    id: String,
    status: DeviceStatus,
}

/// Shared application state
#[derive(Debug, Clone)]
struct AppState {
    version: &'static str,
    registry: Registry,
}

/// Handler for GET /device/on
#[tracing::instrument(skip(state))]
async fn device_on(
    State(state): State<Arc<AppState>>,
    Query(params): DeviceQuery,
) -> impl IntoResponse {
    switch_device(&state.registry, device_id(&params), DeviceStatus::On).await
}

/// Handler for GET /device/off
#[tracing::instrument(skip(state))]
async fn device_off(
    State(state): State<Arc<AppState>>,
    Query(params): DeviceQuery,
) -> impl IntoResponse {
    switch_device(&state.registry, device_id(&params), DeviceStatus::Off).await
}

async fn switch_device(
    registry: &Registry,
    id: &str,
    target: DeviceStatus,
) -> (StatusCode, String) {
    let Some(device) = registry.get(id) else {
        tracing::debug!("Unknown device: {:?}", id);
        return (StatusCode::NOT_FOUND, format!("Device {} not found", id));
    };

    let result = match target {
        DeviceStatus::On => device.turn_on().await,
        DeviceStatus::Off => device.turn_off().await,
    };

    match result {
        Ok(()) => (StatusCode::OK, format!("Device {} turned {}", id, target)),
        Err(e) => {
            tracing::error!(device_id = %id, error = %e, "Failed to turn {} device", target);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to turn {} device", target),
            )
        }
    }
}

/// Handler for GET /device/status
#[tracing::instrument(skip(state))]
async fn device_status(
    State(state): State<Arc<AppState>>,
    Query(params): DeviceQuery,
) -> impl IntoResponse {
    let id = device_id(&params);
    match state.registry.get(id) {
        Some(device) => (
            StatusCode::OK,
            format!("Device {} is {}", id, device.status()),
        ),
        None => (StatusCode::NOT_FOUND, format!("Device {} not found", id)),
    }
}

/// Handler for GET /devices
#[tracing::instrument(skip(state))]
async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let devices: Vec<DeviceSummary> = state
        .registry
        .snapshot()
        .iter()
        .map(|device| DeviceSummary {
            id: device.id().to_string(),
            status: device.status(),
        })
        .collect();

    (StatusCode::OK, Json(devices))
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
            devices: state.registry.len(),
        }),
    )
}

/// Create the API router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/device/on", get(device_on))
        .route("/device/off", get(device_off))
        .route("/device/status", get(device_status))
        .route("/devices", get(list_devices))
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// Binds to `listen:port` and serves the device endpoints backed by
/// `registry` until `shutdown_rx` fires (or its sender is dropped).
pub async fn serve(
    listen: String,
    port: u16,
    registry: Registry,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    let state = Arc::new(AppState { version, registry });
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", listen, port))?;
    tracing::info!("API server started at {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}
