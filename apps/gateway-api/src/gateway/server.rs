//! WebSocket upgrade handler and per-connection event loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time;

use crate::auth::claims::{verify_credential, ConnectionIdentity};
use crate::error::ApiError;
use crate::AppState;

use super::events::{ClientEvent, ServerEvent};
use super::handler::handle_event;
use super::registry::OnlineEntry;
use super::rooms::OutboundFrame;
use super::session::GatewaySession;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

/// Handshake. Authentication runs before the upgrade, so a rejected
/// credential is an HTTP 401 and the socket never opens. The client sees
/// only a generic rejection; the failure detail stays in the server log.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let credential = params
        .get("token")
        .map(String::as_str)
        .or_else(|| headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()));

    let identity = verify_credential(&state.config, credential).map_err(|failure| {
        tracing::warn!(?failure, "gateway handshake rejected");
        ApiError::unauthorized("Authentication failed")
    })?;

    Ok(ws.on_upgrade(move |socket| handle_connection(socket, state, identity)))
}

async fn handle_connection(
    socket: WebSocket,
    state: AppState,
    identity: Option<ConnectionIdentity>,
) {
    let connection_id = campus_common::id::prefixed_ulid(campus_common::id::prefix::CONNECTION);
    let session = GatewaySession::new(connection_id, identity);

    let (mut ws_tx, ws_rx) = socket.split();

    // Subscribe before the presence transition so this connection observes
    // everything that happens after its own snapshot.
    let broadcast_rx = state.router.subscribe();

    if let Some(identity) = &session.identity {
        let now = Utc::now();
        state.registry.set_online(OnlineEntry {
            user_id: identity.user_id.clone(),
            connection_id: session.connection_id.clone(),
            role: identity.role,
            username: identity.username.clone(),
            full_name: identity.full_name.clone(),
            connected_at: now,
            last_seen_at: now,
        });

        // Everyone else learns the user is online; the new connection gets
        // the current snapshot instead.
        state
            .router
            .broadcast_except(&session.connection_id, ServerEvent::user_online(identity));

        let snapshot = ServerEvent::online_list(&state.registry.snapshot());
        if send_event(&mut ws_tx, &snapshot).await.is_err() {
            tracing::debug!(
                connection_id = %session.connection_id,
                "failed to send online snapshot"
            );
        }

        tracing::info!(
            connection_id = %session.connection_id,
            user_id = %identity.user_id,
            "gateway connection established"
        );
    } else {
        tracing::info!(
            connection_id = %session.connection_id,
            "anonymous gateway connection established"
        );
    }

    run_session(&state, &session, ws_tx, ws_rx, broadcast_rx).await;

    // Only an actual close reaches here. Presence moves to last-seen only if
    // this connection is still the one on record for the user.
    if let Some(identity) = &session.identity {
        let at = Utc::now();
        if state
            .registry
            .set_offline(&identity.user_id, &session.connection_id, at)
        {
            state.router.broadcast_except(
                &session.connection_id,
                ServerEvent::user_offline(identity, at),
            );
        }
        tracing::info!(
            connection_id = %session.connection_id,
            user_id = %identity.user_id,
            "gateway connection closed"
        );
    } else {
        tracing::info!(
            connection_id = %session.connection_id,
            "anonymous gateway connection closed"
        );
    }
}

/// Main connection loop: read client events, forward matching broadcast
/// frames, enforce ping liveness.
async fn run_session(
    state: &AppState,
    session: &GatewaySession,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
    mut broadcast_rx: broadcast::Receiver<Arc<OutboundFrame>>,
) {
    let mut ping_timer = time::interval(Duration::from_secs(state.config.ping_interval_secs));
    ping_timer.tick().await; // First tick fires immediately; skip it.
    let timeout = Duration::from_secs(state.config.ping_timeout_secs);
    let mut last_activity = time::Instant::now();

    loop {
        tokio::select! {
            // Client sends us a message.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_activity = time::Instant::now();
                        let event: ClientEvent = match serde_json::from_str(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                tracing::debug!(
                                    ?e,
                                    connection_id = %session.connection_id,
                                    "dropping malformed frame"
                                );
                                continue;
                            }
                        };
                        if let Some(reply) = handle_event(state, session, event) {
                            if send_event(&mut ws_tx, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        last_activity = time::Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        // Transport errors are logged; only a close ends the
                        // session.
                        tracing::debug!(
                            ?e,
                            connection_id = %session.connection_id,
                            "ws read error"
                        );
                    }
                    _ => {}
                }
            }

            // Frame from the room router.
            result = broadcast_rx.recv() => {
                match result {
                    Ok(frame) => {
                        if !session.accepts(&frame.target) {
                            continue;
                        }
                        if send_event(&mut ws_tx, &frame.event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            connection_id = %session.connection_id,
                            skipped = n,
                            "connection lagged behind broadcast"
                        );
                        // Continue; the missed events are simply dropped.
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Liveness check.
            _ = ping_timer.tick() => {
                if last_activity.elapsed() > timeout {
                    tracing::debug!(
                        connection_id = %session.connection_id,
                        "ping timeout, closing connection"
                    );
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn send_event(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).unwrap();
    ws_tx.send(Message::Text(json.into())).await
}
