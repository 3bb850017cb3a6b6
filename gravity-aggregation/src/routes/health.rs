use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use gravity_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::hub::HubState;
use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match super::run_blocking(&state, "health_check", |repo| repo.ping()).await {
        Ok(()) => HealthCheck::healthy("database"),
        Err(e) => HealthCheck::failing("database", HealthStatus::Unhealthy, e.to_string()),
    };

    let hub = match state.hub.state() {
        HubState::Running => HealthCheck::healthy("notification_hub"),
        other => HealthCheck::failing(
            "notification_hub",
            HealthStatus::Degraded,
            format!("hub is {other:?}").to_lowercase(),
        ),
    };

    Json(HealthResponse::from_checks(
        "gravity-aggregation",
        env!("CARGO_PKG_VERSION"),
        vec![database, hub],
    ))
}

pub async fn render_metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
