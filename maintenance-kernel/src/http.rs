/**
 * REST API - HTTP surface of the maintenance kernel
 *
 * ROUTES :
 * - GET  /health          liveness, always open
 * - GET  /system/health   counters + memory + MQTT status
 * - POST /events          run the pipeline for one telemetry event
 * - GET  /devices         ids of the devices seen so far
 * - GET  /devices/{id}    bounded history + last risk of one device
 *
 * SECURITY : when an API key is configured, every route except /health*
 * requires the `x-api-key` header.
 */

use crate::coordinator::{Coordinator, RunOutcome};
use crate::error::MaintenanceError;
use crate::health::KernelHealth;
use crate::models::{DeviceRecord, TelemetryEvent};
use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Coordinator,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(coordinator: Coordinator, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.is_empty()).map(Arc::from);
        Self { coordinator, api_key }
    }
}

async fn require_api_key(State(app): State<AppState>, req: Request, next: Next) -> Result<Response, StatusCode> {
    if req.uri().path().starts_with("/health") {
        return Ok(next.run(req).await);
    }

    let Some(expected) = app.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        warn!("[http] rejected request to {} without valid api key", req.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/events", post(post_event))
        .route("/devices", get(list_devices))
        .route("/devices/{id}", get(get_device))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_api_key))
        .with_state(app_state)
}

impl IntoResponse for MaintenanceError {
    fn into_response(self) -> Response {
        let status = match &self {
            MaintenanceError::Input(_) => StatusCode::BAD_REQUEST,
            MaintenanceError::Configuration(_) | MaintenanceError::Retrieval(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// POST /events
async fn post_event(State(app): State<AppState>, body: Bytes) -> Result<Json<RunOutcome>, MaintenanceError> {
    let event = TelemetryEvent::from_json(&body)?;
    let outcome = app.coordinator.run(&event).await?;
    Ok(Json(outcome))
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    let coordinator = &app.coordinator;
    Json(coordinator.health().snapshot(coordinator.store()))
}

// GET /devices
async fn list_devices(State(app): State<AppState>) -> Json<Vec<String>> {
    Json(app.coordinator.store().device_ids())
}

// GET /devices/{id}
async fn get_device(State(app): State<AppState>, Path(id): Path<String>) -> Result<Json<DeviceRecord>, StatusCode> {
    let record = app.coordinator.store().read_last(&id);
    if record.history.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(record))
}
