use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::application::MonitoringService;
use crate::domain::Measurement;
use crate::ports::SeriesStatus;

/// Longest host name accepted (DNS limit)
const MAX_HOST_LEN: usize = 253;

/// Client-facing API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Host already being monitored")]
    Conflict(String),

    #[error("Host not found")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, host) = match &self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            Self::Conflict(host) => (StatusCode::CONFLICT, Some(host.clone())),
            Self::NotFound(host) => (StatusCode::NOT_FOUND, Some(host.clone())),
        };

        let body = json!({
            "success": false,
            "error": self.to_string(),
            "host": host,
        });
        (status, Json(body)).into_response()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub monitoring_service: Arc<MonitoringService>,
    pub tcp_port: u16,
}

/// Response for /api/latency
#[derive(Debug, Serialize)]
pub struct LatencyResponse {
    pub hosts: Vec<String>,
    pub data: BTreeMap<String, Vec<Measurement>>,
    pub check_interval: u64,
    pub max_history_hours: u64,
}

/// Response for /api/latency/{host}
#[derive(Debug, Serialize)]
pub struct HostLatencyResponse {
    pub host: String,
    pub data: Vec<Measurement>,
    pub check_interval: u64,
}

/// Entry of /api/current; hosts without samples report `unknown`
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CurrentEntry {
    Sample(Measurement),
    Unknown {
        timestamp: Option<String>,
        latency: Option<f64>,
        status: &'static str,
    },
}

impl From<Option<Measurement>> for CurrentEntry {
    fn from(latest: Option<Measurement>) -> Self {
        match latest {
            Some(measurement) => Self::Sample(measurement),
            None => Self::Unknown {
                timestamp: None,
                latency: None,
                status: "unknown",
            },
        }
    }
}

/// Body of /api/current: one entry per host, in registration order
#[derive(Debug)]
pub struct CurrentResponse(Vec<(String, CurrentEntry)>);

impl Serialize for CurrentResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(host, entry)| (host, entry)))
    }
}

/// Response for /api/hosts
#[derive(Debug, Serialize)]
pub struct HostsResponse {
    pub hosts: Vec<String>,
    pub count: usize,
}

/// Successful add/remove
#[derive(Debug, Serialize)]
pub struct HostChangeResponse {
    pub success: bool,
    pub host: String,
    pub message: String,
    pub total_hosts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// Response for /debug
#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub timestamp: String,
    pub monitored_hosts: Vec<String>,
    pub tcp_port: u16,
    pub check_interval: u64,
    pub max_history: usize,
    pub connectivity_tests: BTreeMap<String, BTreeMap<String, String>>,
    pub data_status: BTreeMap<String, SeriesStatus>,
}

/// Query params for /api/latency
#[derive(Debug, Default, Deserialize)]
pub struct LatencyQuery {
    #[serde(default)]
    pub include_removed: bool,
}

/// Body of POST /api/hosts/add and /api/hosts/remove
#[derive(Debug, Deserialize)]
pub struct HostRequest {
    pub host: Option<String>,
}

impl HostRequest {
    fn host(&self) -> Result<String, ApiError> {
        let host = self
            .host
            .as_deref()
            .ok_or(ApiError::BadRequest("Missing host parameter"))?
            .trim();

        if host.is_empty() {
            return Err(ApiError::BadRequest("Host cannot be empty"));
        }
        if host.len() > MAX_HOST_LEN {
            return Err(ApiError::BadRequest("Host name too long"));
        }
        if host.chars().any(|c| c.is_whitespace() || c.is_control()) || host.starts_with('-') {
            return Err(ApiError::BadRequest("Invalid host name"));
        }
        Ok(host.to_string())
    }
}

/// Handler for GET /health
pub async fn health_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

/// Handler for GET /api/latency
pub async fn latency_handler(
    State(state): State<AppState>,
    Query(params): Query<LatencyQuery>,
) -> Json<LatencyResponse> {
    let service = &state.monitoring_service;
    let snapshot = service.snapshot(params.include_removed);

    Json(LatencyResponse {
        hosts: snapshot.hosts,
        data: snapshot.data,
        check_interval: service.check_interval().as_secs(),
        max_history_hours: 24,
    })
}

/// Handler for GET /api/latency/{host}
pub async fn host_latency_handler(
    State(state): State<AppState>,
    Path(host): Path<String>,
) -> Json<HostLatencyResponse> {
    let service = &state.monitoring_service;
    let data = service.series(&host);

    Json(HostLatencyResponse {
        host,
        data,
        check_interval: service.check_interval().as_secs(),
    })
}

/// Handler for GET /api/current
pub async fn current_handler(State(state): State<AppState>) -> Json<CurrentResponse> {
    let current = state
        .monitoring_service
        .latest_per_host()
        .into_iter()
        .map(|(host, latest)| (host, CurrentEntry::from(latest)))
        .collect();

    Json(CurrentResponse(current))
}

/// Handler for GET /api/hosts
pub async fn hosts_handler(State(state): State<AppState>) -> Json<HostsResponse> {
    let hosts = state.monitoring_service.hosts();
    Json(HostsResponse {
        count: hosts.len(),
        hosts,
    })
}

/// Handler for POST /api/hosts/add
pub async fn add_host_handler(
    State(state): State<AppState>,
    Json(request): Json<HostRequest>,
) -> Result<Json<HostChangeResponse>, ApiError> {
    let host = request.host()?;
    let change = state.monitoring_service.add_host(&host);

    if !change.changed {
        return Err(ApiError::Conflict(host));
    }

    Ok(Json(HostChangeResponse {
        success: true,
        message: format!("Now monitoring {}", host),
        host,
        total_hosts: change.total_hosts,
        note: None,
    }))
}

/// Handler for POST /api/hosts/remove
pub async fn remove_host_handler(
    State(state): State<AppState>,
    Json(request): Json<HostRequest>,
) -> Result<Json<HostChangeResponse>, ApiError> {
    let host = request.host()?;
    let change = state.monitoring_service.remove_host(&host);

    if !change.changed {
        return Err(ApiError::NotFound(host));
    }

    Ok(Json(HostChangeResponse {
        success: true,
        message: format!("Stopped monitoring {}", host),
        host,
        total_hosts: change.total_hosts,
        note: Some("Historical data preserved"),
    }))
}

/// Handler for GET /debug
pub async fn debug_handler(State(state): State<AppState>) -> Json<DebugResponse> {
    let service = &state.monitoring_service;
    let connectivity_tests = service.diagnose_all().await;

    Json(DebugResponse {
        timestamp: Utc::now().to_rfc3339(),
        monitored_hosts: service.hosts(),
        tcp_port: state.tcp_port,
        check_interval: service.check_interval().as_secs(),
        max_history: service.capacity(),
        connectivity_tests,
        data_status: service.data_status(),
    })
}
