//! Live dashboard feed over WebSocket
//!
//! ## Protocol
//!
//! Connect: `ws://localhost:8080/realtime?token=<jwt>`
//!
//! The dashboard is picked from the principal's current role. Citizens wake
//! on distress notifications addressed to them; officers wake on every new
//! incident report. Each wake-up re-fetches the whole view.
//!
//! Messages (server -> client):
//! - `snapshot` - Full dashboard contents, on connect and after every signal
//! - `error` - A refresh or client message failed
//! - `pong` - Reply to `ping`
//!
//! Messages (client -> server):
//! - `ping` - Keep-alive
//! - `refresh` - Ask for a fresh snapshot now
//!
//! ```json
//! {
//!   "type": "snapshot",
//!   "timestamp": "2024-01-15T10:30:00Z",
//!   "reason": "insert",
//!   "dashboard": { "view": "user", "profile": {}, "reports": [], "notifications": [] }
//! }
//! ```

use futures_util::{Sink, SinkExt, StreamExt};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::{authenticate, error_response, json_response, to_boxed, BoxBody, ErrorResponse};
use crate::auth::extract_token_from_query;
use crate::dashboard::{open_dashboard, Dashboard, DashboardSnapshot, LiveFeed};
use crate::realtime::Signal;
use crate::server::AppState;
use crate::types::WatchpostError;

/// WebSocket type after upgrade
type HyperWebSocket =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

type FeedResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Message sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Snapshot {
        timestamp: String,
        /// What triggered this snapshot
        reason: &'static str,
        dashboard: DashboardSnapshot,
    },
    Error {
        message: String,
    },
    Pong {
        timestamp: String,
    },
}

/// Message received from client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    Refresh,
}

/// Handle WebSocket upgrade for the dashboard feed
pub async fn handle_realtime_ws(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    // Browsers cannot set headers on WebSocket requests
    let session = match extract_token_from_query(req.uri().query(), "token") {
        Some(token) => state.jwt.session_from_token(&token),
        None => authenticate(&req, &state.jwt),
    };
    let session = match session {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    if !hyper_tungstenite::is_upgrade_request(&req) {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "WebSocket upgrade required".into(),
                code: None,
                field: None,
            },
        );
    }

    let dashboard = match open_dashboard(Arc::clone(&state.service), session).await {
        Ok(dashboard) => dashboard,
        Err(e) => return error_response(e),
    };

    let (response, websocket) = match hyper_tungstenite::upgrade(req, None) {
        Ok((resp, ws)) => (resp, ws),
        Err(e) => {
            error!("WebSocket upgrade failed: {}", e);
            return error_response(WatchpostError::Http(format!("WebSocket upgrade failed: {e}")));
        }
    };

    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => {
                let ws: HyperWebSocket = ws;
                if let Err(e) = handle_feed_connection(ws, dashboard).await {
                    warn!("Realtime WebSocket error: {}", e);
                }
            }
            Err(e) => {
                error!("WebSocket connection failed: {}", e);
            }
        }
    });

    to_boxed(response)
}

/// Drive one dashboard feed until the client leaves
async fn handle_feed_connection(ws: HyperWebSocket, dashboard: Dashboard) -> FeedResult<()> {
    let (mut sender, mut receiver) = ws.split();
    let principal = dashboard.session().principal_id;
    info!(%principal, role = %dashboard.role(), "Realtime client connected");

    // Subscribe before the first snapshot so no insert falls in between
    let mut feed = dashboard.live();
    send_snapshot(&mut sender, &feed, "connect").await?;

    loop {
        let reason = tokio::select! {
            signal = feed.next_signal() => match signal {
                Some(Signal::Insert(event)) => {
                    debug!(%principal, table = %event.table, "Change signal");
                    "insert"
                }
                Some(Signal::Lagged(skipped)) => {
                    debug!(%principal, skipped, "Realtime feed lagged");
                    "lagged"
                }
                None => break,
            },

            msg = receiver.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Ping) => {
                        send(&mut sender, &FeedMessage::Pong { timestamp: now_iso() }).await?;
                        continue;
                    }
                    Ok(ClientMessage::Refresh) => "refresh",
                    Err(e) => {
                        send(&mut sender, &FeedMessage::Error { message: format!("Invalid message: {e}") }).await?;
                        continue;
                    }
                },
                Some(Ok(WsMessage::Ping(data))) => {
                    sender.send(WsMessage::Pong(data)).await?;
                    continue;
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!(%principal, "Realtime client disconnected");
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!(%principal, "Realtime receive error: {}", e);
                    break;
                }
            },
        };

        // Fetch outside the select so a client message never cancels a refresh
        send_snapshot(&mut sender, &feed, reason).await?;
    }

    Ok(())
}

async fn send_snapshot<S>(sender: &mut S, feed: &LiveFeed, reason: &'static str) -> FeedResult<()>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let message = match feed.refresh().await {
        Ok(dashboard) => FeedMessage::Snapshot {
            timestamp: now_iso(),
            reason,
            dashboard,
        },
        Err(e) => {
            warn!(principal = %feed.dashboard().session().principal_id, error = %e, "Dashboard refresh failed");
            FeedMessage::Error {
                message: e.public_message(),
            }
        }
    };
    send(sender, &message).await
}

async fn send<S>(sender: &mut S, message: &FeedMessage) -> FeedResult<()>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let json = serde_json::to_string(message)?;
    sender.send(WsMessage::Text(json)).await?;
    Ok(())
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#).unwrap(),
            ClientMessage::Ping
        ));
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"refresh"}"#).unwrap(),
            ClientMessage::Refresh
        ));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_pong_wire_format() {
        let json = serde_json::to_value(FeedMessage::Pong {
            timestamp: "t".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "pong");
    }
}
