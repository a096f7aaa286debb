//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection, upgrades enabled
//! for the realtime WebSocket.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::routes::{self, BoxBody};
use crate::service::IncidentService;
use crate::types::WatchpostError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub service: Arc<IncidentService>,
    pub jwt: JwtValidator,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, service: Arc<IncidentService>, jwt: JwtValidator) -> Self {
        Self {
            args,
            service,
            jwt,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server on the configured address
pub async fn run(state: Arc<AppState>) -> Result<(), WatchpostError> {
    let listener = TcpListener::bind(state.args.listen).await?;
    serve(listener, state).await
}

/// Accept connections on an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), WatchpostError> {
    info!(
        "Watchpost listening on {} ({} backend)",
        listener.local_addr()?,
        state.service.backend().name()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }
    if state.args.api_key_admin.is_none() {
        info!("API_KEY_ADMIN not set - admin endpoints disabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    if path.starts_with("/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(routes::not_found_response(&path));
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state)).await
        }

        (Method::GET, "/realtime") => routes::handle_realtime_ws(req, Arc::clone(&state)).await,

        (Method::GET, p) if p.starts_with("/videos/") => {
            routes::handle_video_download(req, Arc::clone(&state)).await
        }

        (_, p) if p.starts_with("/api/") => routes::handle_api_request(req, Arc::clone(&state)).await,

        (_, p) if p.starts_with("/admin/") => {
            routes::handle_admin_request(req, Arc::clone(&state)).await
        }

        (Method::OPTIONS, _) => routes::cors_preflight(),

        _ => routes::not_found_response(&path),
    };

    Ok(response)
}
