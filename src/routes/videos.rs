//! Video upload and download
//!
//! - PUT /api/videos                 - raw `video/*` body, returns the stored URL
//! - GET /videos/{owner}/{file}      - owner or officer; `?token=` accepted for media tags

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use super::{
    authenticate, content_type, error_response, full_body, json_response, parse_id,
    read_body_limited, segments, BoxBody,
};
use crate::auth::{extract_token_from_query, Session};
use crate::server::AppState;
use crate::types::{Result, WatchpostError};

pub async fn handle_video_upload(
    req: Request<Incoming>,
    state: Arc<AppState>,
    session: Session,
) -> Response<BoxBody> {
    upload(req, &state, &session)
        .await
        .unwrap_or_else(error_response)
}

async fn upload(req: Request<Incoming>, state: &AppState, session: &Session) -> Result<Response<BoxBody>> {
    let content_type = content_type(&req).to_string();
    let data = read_body_limited(req, state.service.videos().max_bytes()).await?;
    let stored = state.service.upload_video(session, &content_type, &data).await?;
    Ok(json_response(StatusCode::CREATED, &stored))
}

pub async fn handle_video_download(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    download(req, &state).await.unwrap_or_else(error_response)
}

async fn download(req: Request<Incoming>, state: &AppState) -> Result<Response<BoxBody>> {
    let session = match extract_token_from_query(req.uri().query(), "token") {
        Some(token) => state.jwt.session_from_token(&token)?,
        None => authenticate(&req, &state.jwt)?,
    };

    let path = req.uri().path().to_string();
    let (owner, file_name) = match segments(&path, "/videos/").as_slice() {
        [owner, file] => (parse_id(owner)?, file.to_string()),
        _ => return Err(WatchpostError::NotFound(format!("video {path}"))),
    };

    let video = state.service.open_video(&session, owner, &file_name).await?;
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", video.content_type)
        .header("Content-Length", video.data.len())
        .header("Cache-Control", "private, max-age=3600")
        .header("Access-Control-Allow-Origin", "*")
        .body(full_body(video.data))
        .unwrap())
}
