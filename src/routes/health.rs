//! Health check endpoint
//!
//! `/health` answers 200 while the backend responds to a ping and 503
//! otherwise, so it serves as both liveness and readiness probe.

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    /// 'online' or 'degraded'
    pub status: &'static str,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub backend: &'static str,
    pub realtime_subscribers: usize,
    pub mode: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    let backend = state.service.backend();
    let ping = backend.ping().await;
    let healthy = ping.is_ok();

    let body = HealthResponse {
        healthy,
        status: if healthy { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        backend: backend.name(),
        realtime_subscribers: state.service.hub().subscriber_count(),
        mode: if state.args.dev_mode { "development" } else { "production" },
        timestamp: chrono::Utc::now().to_rfc3339(),
        error: ping.err().map(|e| e.public_message()),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, &body)
}
