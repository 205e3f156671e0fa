//! HTTP API: the admission endpoint plus health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::DynamicObject;
use prometheus::{Encoder, TextEncoder};
use sizer_lib::{
    health::{ComponentStatus, HealthRegistry},
    PodMutator,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub mutator: PodMutator,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(mutator: PodMutator, health_registry: HealthRegistry) -> Self {
        Self {
            mutator,
            health_registry,
        }
    }
}

/// Admission review for pods. Always answers with an `AdmissionReview`;
/// reviews that cannot be read get a 400 with an invalid response.
async fn mutate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AdmissionReview<DynamicObject>>, JsonRejection>,
) -> impl IntoResponse {
    let review = match body {
        Ok(Json(review)) => review,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable admission review");
            return invalid(rejection.body_text());
        }
    };

    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "Admission review without request");
            return invalid(err.to_string());
        }
    };

    let response = state.mutator.review(&request).await;
    (StatusCode::OK, Json(response.into_review()))
}

fn invalid(reason: String) -> (StatusCode, Json<AdmissionReview<DynamicObject>>) {
    (
        StatusCode::BAD_REQUEST,
        Json(AdmissionResponse::invalid(reason).into_review()),
    )
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // Metrics store outages fail open, so degraded still serves
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            err.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Router for the admission endpoint
pub fn webhook_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/mutate", post(mutate))
        .with_state(state)
}

/// Router for health and metrics
pub fn ops_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve a router over plain HTTP
pub async fn serve(port: u16, app: Router) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wait for a server task to end and mark `component` unhealthy.
///
/// Servers only return on failure, so any exit also clears readiness. Returns
/// the reason the server stopped.
pub async fn supervise(
    component: &str,
    task: JoinHandle<anyhow::Result<()>>,
    health_registry: HealthRegistry,
) -> String {
    let reason = match task.await {
        Ok(Ok(())) => "server stopped".to_string(),
        Ok(Err(err)) => format!("server failed: {:#}", err),
        Err(err) => format!("server task aborted: {}", err),
    };

    error!(component, reason = %reason, "Server exited");
    health_registry.set_unhealthy(component, reason.clone()).await;
    health_registry.set_ready(false).await;

    reason
}
