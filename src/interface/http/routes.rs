use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::application::MonitoringService;
use crate::interface::web::{index_handler, static_handler};

use super::handlers::{
    add_host_handler, current_handler, debug_handler, health_handler, host_latency_handler,
    hosts_handler, latency_handler, remove_host_handler, AppState,
};

pub fn create_router(monitoring_service: Arc<MonitoringService>, tcp_port: u16) -> Router {
    let state = AppState {
        monitoring_service,
        tcp_port,
    };

    Router::new()
        // Dashboard
        .route("/", get(index_handler))
        .route("/static/{*file}", get(static_handler))
        // Liveness and diagnostics
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/debug", get(debug_handler))
        // Query API
        .route("/api/latency", get(latency_handler))
        .route("/api/latency/{host}", get(host_latency_handler))
        .route("/api/current", get(current_handler))
        .route("/api/hosts", get(hosts_handler))
        // Registry mutations
        .route("/api/hosts/add", post(add_host_handler))
        .route("/api/hosts/remove", post(remove_host_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
