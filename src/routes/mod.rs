//! HTTP routes for Watchpost
//!
//! Shared response helpers live here; each route family has its own module.

pub mod admin;
pub mod api;
pub mod auth_routes;
pub mod health;
pub mod realtime;
pub mod videos;

pub use admin::handle_admin_request;
pub use api::handle_api_request;
pub use auth_routes::handle_auth_request;
pub use health::health_check;
pub use realtime::handle_realtime_ws;
pub use videos::{handle_video_download, handle_video_upload};

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::auth::{extract_token_from_header, JwtValidator, Session};
use crate::types::{Result, WatchpostError};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Upper bound for JSON request bodies
pub const MAX_JSON_BODY: usize = 64 * 1024;

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Api-Key";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .body(full_body(json))
        .unwrap()
}

/// Turn an error into a JSON response, logging what the client does not see
pub fn error_response(err: WatchpostError) -> Response<BoxBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        debug!(error = %err, "Request rejected");
    }

    let field = match &err {
        WatchpostError::Validation { field, .. } => Some(*field),
        _ => None,
    };

    json_response(
        status,
        &ErrorResponse {
            error: err.public_message(),
            code: Some(err.code().to_string()),
            field,
        },
    )
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("No route for {path}"),
            code: Some("NOT_FOUND".into()),
            field: None,
        },
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: None,
            field: None,
        },
    )
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

/// Read a whole body, refusing anything over `limit` bytes
pub async fn read_body_limited(req: Request<Incoming>, limit: usize) -> Result<Bytes> {
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(
            WatchpostError::PayloadTooLarge(format!("body exceeds {limit} bytes")),
        ),
        Err(e) => Err(WatchpostError::Http(format!("Failed to read body: {}", e))),
    }
}

pub async fn parse_json_body<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T> {
    let bytes = read_body_limited(req, MAX_JSON_BODY).await?;
    serde_json::from_slice(&bytes).map_err(|e| WatchpostError::Http(format!("Invalid JSON: {}", e)))
}

pub fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Session from the `Authorization: Bearer` header
pub fn authenticate(req: &Request<Incoming>, jwt: &JwtValidator) -> Result<Session> {
    let token = extract_token_from_header(get_auth_header(req))
        .ok_or_else(|| WatchpostError::Unauthorized("Missing bearer token".into()))?;
    jwt.session_from_token(token)
}

pub fn content_type(req: &Request<Incoming>) -> &str {
    req.headers()
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Parse an id taken from the path
pub fn parse_id(segment: &str) -> Result<Uuid> {
    Uuid::parse_str(segment).map_err(|_| WatchpostError::BadRequest(format!("Invalid id '{segment}'")))
}

/// Path segments after `prefix`, without empty pieces
pub fn segments<'a>(path: &'a str, prefix: &str) -> Vec<&'a str> {
    path.strip_prefix(prefix)
        .unwrap_or("")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}
