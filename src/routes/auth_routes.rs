//! HTTP Routes for Authentication
//!
//! - POST /auth/register - Create credentials and a profile, get a JWT
//! - POST /auth/login    - Authenticate and get a JWT
//! - GET  /auth/me       - Profile of the token's principal

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{authenticate, cors_preflight, error_response, json_response, method_not_allowed, parse_json_body, BoxBody};
use crate::models::{Profile, RegistrationMetadata};
use crate::server::AppState;
use crate::service::Authenticated;
use crate::types::Result;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Optional profile fields (full_name, address, phone_number, sex, gender)
    #[serde(flatten)]
    pub metadata: RegistrationMetadata,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub principal_id: String,
    pub email: String,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

fn issue_token(state: &AppState, auth: &Authenticated, profile: Option<Profile>) -> Result<AuthResponse> {
    let token = state.jwt.generate_token(
        auth.session.principal_id,
        &auth.session.email,
        auth.token_version,
    )?;
    Ok(AuthResponse {
        token,
        principal_id: auth.session.principal_id.to_string(),
        email: auth.session.email.clone(),
        expires_in: state.jwt.expiry_seconds(),
        profile,
    })
}

async fn handle_register(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let body: RegisterRequest = parse_json_body(req).await?;
    let (auth, profile) = state
        .service
        .register(&body.email, &body.password, body.metadata)
        .await?;

    info!(principal = %auth.session.principal_id, "Registration complete");
    let response = issue_token(&state, &auth, Some(profile))?;
    Ok(json_response(StatusCode::CREATED, &response))
}

async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let body: LoginRequest = parse_json_body(req).await?;
    let auth = state.service.authenticate(&body.email, &body.password).await?;
    let profile = state.service.me(&auth.session).await.ok();
    let response = issue_token(&state, &auth, profile)?;
    Ok(json_response(StatusCode::OK, &response))
}

async fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let session = authenticate(&req, &state.jwt)?;
    let profile = state.service.me(&session).await?;
    Ok(json_response(StatusCode::OK, &profile))
}

/// Route /auth/* requests. Returns None for paths outside /auth.
pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    if !path.starts_with("/auth") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let result = match (req.method().clone(), path.as_str()) {
        (Method::POST, "/auth/register") => handle_register(req, state).await,
        (Method::POST, "/auth/login") => handle_login(req, state).await,
        (Method::GET, "/auth/me") => handle_me(req, state).await,
        (_, "/auth/register") | (_, "/auth/login") | (_, "/auth/me") => Ok(method_not_allowed()),
        _ => Ok(super::not_found_response(&path)),
    };

    Some(result.unwrap_or_else(error_response))
}
