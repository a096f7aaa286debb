//! Out-of-band administration
//!
//! Gated by `X-Api-Key` matching `API_KEY_ADMIN`. Admin routes answer 404
//! when no key is configured.
//!
//! - PUT    /admin/profiles/{id}/role   - body `{"role": "officer"}`
//! - DELETE /admin/principals/{id}      - cascade delete

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::{
    cors_preflight, error_response, json_response, method_not_allowed, not_found_response,
    parse_id, parse_json_body, segments, BoxBody,
};
use crate::models::Role;
use crate::server::AppState;
use crate::types::{Result, WatchpostError};

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

fn check_api_key(req: &Request<Incoming>, state: &AppState) -> Result<()> {
    let Some(expected) = state.args.api_key_admin.as_deref() else {
        return Err(WatchpostError::NotFound("admin endpoints are disabled".into()));
    };

    let provided = req
        .headers()
        .get("X-Api-Key")
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if key == expected => Ok(()),
        Some(_) => {
            warn!("Admin request with wrong API key");
            Err(WatchpostError::Unauthorized("Invalid API key".into()))
        }
        None => Err(WatchpostError::Unauthorized("Missing X-Api-Key header".into())),
    }
}

/// Route /admin/* requests
pub async fn handle_admin_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    if req.method() == Method::OPTIONS {
        return cors_preflight();
    }
    if let Err(e) = check_api_key(&req, &state) {
        return error_response(e);
    }

    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let segs = segments(&path, "/admin/");

    let result = match (method, segs.as_slice()) {
        (Method::PUT, ["profiles", id, "role"]) => set_role(req, &state, id).await,
        (Method::DELETE, ["principals", id]) => delete_principal(&state, id).await,
        (_, ["profiles", _, "role"]) | (_, ["principals", _]) => Ok(method_not_allowed()),
        _ => Ok(not_found_response(&path)),
    };

    result.unwrap_or_else(error_response)
}

async fn set_role(req: Request<Incoming>, state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let body: RoleRequest = parse_json_body(req).await?;
    let profile = state.service.set_role(id, body.role).await?;
    Ok(json_response(StatusCode::OK, &profile))
}

async fn delete_principal(state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let summary = state.service.delete_principal(id).await?;
    Ok(json_response(StatusCode::OK, &summary))
}
