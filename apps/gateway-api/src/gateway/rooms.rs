//! Room router: directed-send primitives over a broadcast hub.
//!
//! Uses a single `tokio::sync::broadcast` channel. Each connected session
//! subscribes and filters frames locally against the target. Delivery is
//! fire-and-forget: none of these operations report whether anyone was
//! listening, and an event aimed at a user with no live connection is
//! silently dropped.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::events::ServerEvent;

/// Capacity of the broadcast channel. Slow receivers that fall behind will
/// skip messages (RecvError::Lagged).
const BROADCAST_CAPACITY: usize = 4096;

/// Name of a user's private room. One room per user id; a connection joins
/// its own user room at connect time and no other.
pub fn user_room(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Who a frame is for. Evaluated locally by each session.
#[derive(Debug, Clone)]
pub enum Target {
    /// Every connected session.
    All,
    /// Every session except one connection. Presence broadcasts skip the
    /// connection that caused them.
    AllExcept(String),
    /// Sessions joined to a room, optionally excluding one connection.
    Room {
        room: String,
        except: Option<String>,
    },
}

/// A frame queued for delivery to connected sessions.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub target: Target,
    pub event: ServerEvent,
}

/// Directed-send primitives. Cloneable; stored in `AppState`.
#[derive(Clone)]
pub struct RoomRouter {
    sender: broadcast::Sender<Arc<OutboundFrame>>,
}

impl RoomRouter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Subscribe to the hub. Each gateway session calls this once to get its
    /// own receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<OutboundFrame>> {
        self.sender.subscribe()
    }

    /// Deliver an event to one user's room.
    pub fn send_to_user(&self, user_id: &str, event: ServerEvent) {
        self.dispatch(
            Target::Room {
                room: user_room(user_id),
                except: None,
            },
            event,
        );
    }

    /// Deliver the same event to several users' rooms. N independent sends:
    /// no ordering across recipients and partial delivery is possible.
    pub fn send_to_users<'a>(
        &self,
        user_ids: impl IntoIterator<Item = &'a str>,
        event: ServerEvent,
    ) {
        for user_id in user_ids {
            self.send_to_user(user_id, event.clone());
        }
    }

    /// Deliver to every connected session.
    pub fn broadcast_all(&self, event: ServerEvent) {
        self.dispatch(Target::All, event);
    }

    /// Deliver to every session except the named connection.
    pub fn broadcast_except(&self, connection_id: &str, event: ServerEvent) {
        self.dispatch(Target::AllExcept(connection_id.to_string()), event);
    }

    /// Deliver to a caller-supplied room, optionally excluding a connection.
    /// Used by typing relays, where any connection may target any room id.
    pub fn send_to_room(&self, room: &str, except: Option<&str>, event: ServerEvent) {
        self.dispatch(
            Target::Room {
                room: room.to_string(),
                except: except.map(str::to_string),
            },
            event,
        );
    }

    fn dispatch(&self, target: Target, event: ServerEvent) {
        // send() errors when there are no receivers at all. An offline
        // target is routine, not a fault, so the result is ignored.
        let _ = self.sender.send(Arc::new(OutboundFrame { target, event }));
    }
}

impl Default for RoomRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_room_name() {
        assert_eq!(user_room("usr_1"), "user:usr_1");
    }

    #[tokio::test]
    async fn send_to_user_reaches_subscribers() {
        let router = RoomRouter::new();
        let mut rx = router.subscribe();

        router.send_to_user("usr_1", ServerEvent::new("x", serde_json::json!({"a": 1})));

        let frame = rx.recv().await.unwrap();
        match &frame.target {
            Target::Room { room, except } => {
                assert_eq!(room, "user:usr_1");
                assert!(except.is_none());
            }
            other => panic!("unexpected target: {other:?}"),
        }
        assert_eq!(frame.event.event, "x");
    }

    #[tokio::test]
    async fn send_to_users_is_independent_sends() {
        let router = RoomRouter::new();
        let mut rx = router.subscribe();

        router.send_to_users(
            ["usr_1", "usr_2"],
            ServerEvent::new("x", serde_json::Value::Null),
        );

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let rooms: Vec<String> = [first, second]
            .iter()
            .map(|f| match &f.target {
                Target::Room { room, .. } => room.clone(),
                other => panic!("unexpected target: {other:?}"),
            })
            .collect();
        assert_eq!(rooms, vec!["user:usr_1", "user:usr_2"]);
    }

    #[test]
    fn send_without_receivers_does_not_fail() {
        let router = RoomRouter::new();
        // No subscribers. Fire-and-forget must not panic or report.
        router.send_to_user("usr_nobody", ServerEvent::new("x", serde_json::Value::Null));
        router.broadcast_all(ServerEvent::new("y", serde_json::Value::Null));
    }
}
