pub mod bot;
pub mod config;
pub mod geo;
pub mod hub;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub repo: Arc<dyn store::ProfileRepository>,
    pub config: config::AppConfig,
    pub hub: hub::HubHandle,
    pub metrics: PrometheusHandle,
}
