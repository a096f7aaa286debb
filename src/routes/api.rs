//! REST API for profiles, incident reports and distress notifications
//!
//! All routes require `Authorization: Bearer <jwt>`. Rows the caller may not
//! read answer 404; writes the policy denies answer 403.
//!
//! - GET   /api/profiles
//! - GET   /api/profiles/{id}
//! - PATCH /api/profiles/{id}
//! - GET   /api/reports
//! - POST  /api/reports                      (JSON, or a video/* body with query metadata)
//! - GET   /api/reports/{id}
//! - PATCH /api/reports/{id}
//! - POST  /api/reports/{id}/status
//! - GET   /api/notifications
//! - POST  /api/notifications
//! - GET   /api/notifications/{id}
//! - POST  /api/notifications/{id}/acknowledge
//! - PUT   /api/videos

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::{
    authenticate, content_type, cors_preflight, error_response, json_response, method_not_allowed,
    not_found_response, parse_id, parse_json_body, read_body_limited, segments, BoxBody,
};
use crate::auth::Session;
use crate::models::{
    IncidentPatch, IncidentStatus, NewDistressNotification, NewIncidentReport, ProfileUpdate,
};
use crate::server::AppState;
use crate::service::VideoUpload;
use crate::types::{Result, WatchpostError};

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: IncidentStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T: Serialize> {
    items: Vec<T>,
    count: usize,
}

fn list<T: Serialize>(items: Vec<T>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &ListResponse {
            count: items.len(),
            items,
        },
    )
}

fn found<T: Serialize>(row: Option<T>, what: &str) -> Result<Response<BoxBody>> {
    match row {
        Some(row) => Ok(json_response(StatusCode::OK, &row)),
        None => Err(WatchpostError::NotFound(what.to_string())),
    }
}

/// Route /api/* requests
pub async fn handle_api_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    if req.method() == Method::OPTIONS {
        return cors_preflight();
    }

    let path = req.uri().path().to_string();
    let session = match authenticate(&req, &state.jwt) {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    let method = req.method().clone();
    let segs = segments(&path, "/api/");

    let result = match (method, segs.as_slice()) {
        // Profiles
        (Method::GET, ["profiles"]) => state.service.list_profiles(&session).await.map(list),
        (Method::GET, ["profiles", id]) => match parse_id(id) {
            Ok(id) => match state.service.get_profile(&session, id).await {
                Ok(row) => found(row, "profile"),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        },
        (Method::PATCH, ["profiles", id]) => update_profile(req, &state, &session, id).await,

        // Incident reports
        (Method::GET, ["reports"]) => state.service.list_reports(&session).await.map(list),
        (Method::POST, ["reports"]) => submit_report(req, &state, &session).await,
        (Method::GET, ["reports", id]) => match parse_id(id) {
            Ok(id) => match state.service.get_report(&session, id).await {
                Ok(row) => found(row, "incident report"),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        },
        (Method::PATCH, ["reports", id]) => update_report(req, &state, &session, id).await,
        (Method::POST, ["reports", id, "status"]) => set_status(req, &state, &session, id).await,

        // Distress notifications
        (Method::GET, ["notifications"]) => {
            state.service.list_notifications(&session).await.map(list)
        }
        (Method::POST, ["notifications"]) => send_distress(req, &state, &session).await,
        (Method::GET, ["notifications", id]) => match parse_id(id) {
            Ok(id) => match state.service.get_notification(&session, id).await {
                Ok(row) => found(row, "distress notification"),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        },
        (Method::POST, ["notifications", id, "acknowledge"]) => match parse_id(id) {
            Ok(id) => state
                .service
                .acknowledge(&session, id)
                .await
                .map(|n| json_response(StatusCode::OK, &n)),
            Err(e) => Err(e),
        },

        // Videos
        (Method::PUT, ["videos"]) => {
            return super::videos::handle_video_upload(req, Arc::clone(&state), session).await
        }

        (_, ["profiles"]) | (_, ["profiles", _]) | (_, ["reports"]) | (_, ["reports", _])
        | (_, ["reports", _, "status"]) | (_, ["notifications"]) | (_, ["notifications", _])
        | (_, ["notifications", _, "acknowledge"]) | (_, ["videos"]) => Ok(method_not_allowed()),

        _ => Ok(not_found_response(&path)),
    };

    result.unwrap_or_else(error_response)
}

async fn update_profile(
    req: Request<Incoming>,
    state: &AppState,
    session: &Session,
    id: &str,
) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let update: ProfileUpdate = parse_json_body(req).await?;
    let profile = state.service.update_profile(session, id, &update).await?;
    Ok(json_response(StatusCode::OK, &profile))
}

/// JSON form, or raw video with the form in the query string
async fn submit_report(
    req: Request<Incoming>,
    state: &AppState,
    session: &Session,
) -> Result<Response<BoxBody>> {
    let content_type = content_type(&req).to_string();
    if !content_type.starts_with("video/") {
        let form: NewIncidentReport = parse_json_body(req).await?;
        let submitted = state.service.submit_report_with_video(session, form, None).await?;
        return Ok(json_response(StatusCode::CREATED, &submitted));
    }

    let form: NewIncidentReport = serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
        .map_err(|e| WatchpostError::BadRequest(format!("Invalid report metadata: {}", e)))?;

    let limit = state.service.videos().max_bytes();
    let (video, read_warning) = match read_body_limited(req, limit).await {
        Ok(data) => (Some(VideoUpload { content_type, data }), None),
        Err(e) => {
            warn!(reporter = %session.principal_id, error = %e, "Could not read video body");
            (None, Some(format!("Video upload failed: {}", e.public_message())))
        }
    };

    let mut submitted = state.service.submit_report_with_video(session, form, video).await?;
    if let Some(warning) = read_warning {
        submitted.warnings.insert(0, warning);
    }
    Ok(json_response(StatusCode::CREATED, &submitted))
}

async fn update_report(
    req: Request<Incoming>,
    state: &AppState,
    session: &Session,
    id: &str,
) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let patch: IncidentPatch = parse_json_body(req).await?;
    let report = state.service.update_report(session, id, &patch).await?;
    Ok(json_response(StatusCode::OK, &report))
}

async fn set_status(
    req: Request<Incoming>,
    state: &AppState,
    session: &Session,
    id: &str,
) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let body: StatusRequest = parse_json_body(req).await?;
    let report = state.service.set_report_status(session, id, body.status).await?;
    Ok(json_response(StatusCode::OK, &report))
}

async fn send_distress(
    req: Request<Incoming>,
    state: &AppState,
    session: &Session,
) -> Result<Response<BoxBody>> {
    let request: NewDistressNotification = parse_json_body(req).await?;
    let notification = state.service.send_distress(session, request).await?;
    Ok(json_response(StatusCode::CREATED, &notification))
}
