//! Inbound event dispatch: presence queries, typing relays, and advisory
//! notification signals.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::AppState;

use super::events::{
    ClientEvent, EventName, GetLastSeenPayload, NotificationReadPayload, ServerEvent, TypingPayload,
};
use super::session::GatewaySession;

/// Process one client event. Returns an event to unicast back to the
/// requester when the event calls for a reply.
///
/// Handlers never fail the connection: malformed payloads and unknown
/// events are logged at debug level and dropped.
pub fn handle_event(
    state: &AppState,
    session: &GatewaySession,
    event: ClientEvent,
) -> Option<ServerEvent> {
    match event.event.as_str() {
        EventName::USERS_GET_ONLINE => Some(ServerEvent::online_list(&state.registry.snapshot())),
        EventName::USER_GET_LAST_SEEN => {
            let payload: GetLastSeenPayload = parse(event.data)?;
            Some(ServerEvent::last_seen(
                &payload.user_id,
                state.registry.is_online(&payload.user_id),
                state.registry.get_last_seen(&payload.user_id),
            ))
        }
        EventName::TYPING_START | EventName::TYPING_STOP => {
            relay_typing(state, session, &event.event, event.data);
            None
        }
        EventName::NOTIFICATION_READ => {
            // Advisory only. The notification service owns the read-state
            // mutation, reached over HTTP.
            if let Some(payload) = parse::<NotificationReadPayload>(event.data) {
                tracing::debug!(
                    connection_id = %session.connection_id,
                    notification_id = %payload.notification_id,
                    "notification read signal"
                );
            }
            None
        }
        EventName::NOTIFICATION_GET_COUNT => {
            tracing::debug!(
                connection_id = %session.connection_id,
                "notification count signal"
            );
            None
        }
        other => {
            tracing::debug!(
                connection_id = %session.connection_id,
                event = %other,
                "ignoring unknown event"
            );
            None
        }
    }
}

/// Relay a typing indicator into the caller-supplied room, tagged with the
/// sender's user id. Ephemeral: no debounce, no stored state; clearing a
/// stuck indicator is the client's job. Anonymous connections are dropped.
fn relay_typing(state: &AppState, session: &GatewaySession, event: &str, data: Value) {
    let Some(identity) = &session.identity else {
        tracing::debug!(
            connection_id = %session.connection_id,
            "typing event from anonymous connection dropped"
        );
        return;
    };
    let Some(payload) = parse::<TypingPayload>(data) else {
        return;
    };
    state.router.send_to_room(
        &payload.room_id,
        Some(&session.connection_id),
        ServerEvent::typing(event, &identity.user_id),
    );
}

fn parse<T: DeserializeOwned>(data: Value) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::debug!(?e, "malformed event payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{ConnectionIdentity, Role};
    use crate::config::{Config, RunMode};
    use crate::gateway::registry::OnlineEntry;
    use crate::gateway::rooms::Target;

    fn test_state() -> AppState {
        AppState::new(Config {
            port: 0,
            jwt_secret: "secret".to_string(),
            mode: RunMode::Development,
            allowed_origins: Vec::new(),
            ping_interval_secs: 25,
            ping_timeout_secs: 60,
            service_key: "svc".to_string(),
        })
    }

    fn identified_session(user_id: &str, connection_id: &str) -> GatewaySession {
        GatewaySession::new(
            connection_id.to_string(),
            Some(ConnectionIdentity {
                user_id: user_id.to_string(),
                role: Role::Student,
                username: None,
                full_name: None,
            }),
        )
    }

    fn client_event(event: &str, data: serde_json::Value) -> ClientEvent {
        ClientEvent {
            event: event.to_string(),
            data,
        }
    }

    #[test]
    fn get_online_replies_with_snapshot() {
        let state = test_state();
        let now = chrono::Utc::now();
        state.registry.set_online(OnlineEntry {
            user_id: "u1".to_string(),
            connection_id: "cn_a".to_string(),
            role: Role::Student,
            username: None,
            full_name: None,
            connected_at: now,
            last_seen_at: now,
        });

        let session = identified_session("u2", "cn_b");
        let reply = handle_event(
            &state,
            &session,
            client_event(EventName::USERS_GET_ONLINE, serde_json::Value::Null),
        )
        .unwrap();

        assert_eq!(reply.event, EventName::USERS_ONLINE_LIST);
        let users = reply.data["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["userId"], "u1");
    }

    #[test]
    fn get_last_seen_replies_for_unknown_user() {
        let state = test_state();
        let session = identified_session("u1", "cn_a");
        let reply = handle_event(
            &state,
            &session,
            client_event(
                EventName::USER_GET_LAST_SEEN,
                serde_json::json!({"userId": "ghost"}),
            ),
        )
        .unwrap();

        assert_eq!(reply.event, EventName::USER_LAST_SEEN);
        assert_eq!(reply.data["isOnline"], false);
        assert!(reply.data["lastSeenAt"].is_null());
    }

    #[tokio::test]
    async fn typing_relays_to_room_excluding_sender() {
        let state = test_state();
        let mut rx = state.router.subscribe();
        let session = identified_session("u1", "cn_a");

        let reply = handle_event(
            &state,
            &session,
            client_event(
                EventName::TYPING_START,
                serde_json::json!({"roomId": "user:u2"}),
            ),
        );
        assert!(reply.is_none());

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event.event, EventName::TYPING_START);
        assert_eq!(frame.event.data["userId"], "u1");
        match &frame.target {
            Target::Room { room, except } => {
                assert_eq!(room, "user:u2");
                assert_eq!(except.as_deref(), Some("cn_a"));
            }
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn typing_from_anonymous_connection_is_dropped() {
        let state = test_state();
        let mut rx = state.router.subscribe();
        let session = GatewaySession::new("cn_a".to_string(), None);

        handle_event(
            &state,
            &session,
            client_event(
                EventName::TYPING_START,
                serde_json::json!({"roomId": "user:u2"}),
            ),
        );

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn malformed_payload_is_dropped_without_reply() {
        let state = test_state();
        let session = identified_session("u1", "cn_a");
        let reply = handle_event(
            &state,
            &session,
            client_event(EventName::USER_GET_LAST_SEEN, serde_json::json!({"bogus": 1})),
        );
        assert!(reply.is_none());
    }

    #[test]
    fn unknown_event_is_ignored() {
        let state = test_state();
        let session = identified_session("u1", "cn_a");
        let reply = handle_event(
            &state,
            &session,
            client_event("no:such-event", serde_json::Value::Null),
        );
        assert!(reply.is_none());
    }
}
