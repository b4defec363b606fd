//! Per-connection gateway session state.

use crate::auth::claims::ConnectionIdentity;

use super::rooms::{user_room, Target};

/// State for a single WebSocket connection.
pub struct GatewaySession {
    /// Unique connection identifier (`cn_` prefixed ULID).
    pub connection_id: String,
    /// Identity attached at handshake time. Absent for anonymous
    /// development-mode connections, which never enter the registry.
    pub identity: Option<ConnectionIdentity>,
    /// The user room this connection joined, if identified.
    room: Option<String>,
}

impl GatewaySession {
    pub fn new(connection_id: String, identity: Option<ConnectionIdentity>) -> Self {
        let room = identity.as_ref().map(|id| user_room(&id.user_id));
        Self {
            connection_id,
            identity,
            room,
        }
    }

    /// Whether a frame aimed at `target` should be delivered on this
    /// connection.
    pub fn accepts(&self, target: &Target) -> bool {
        match target {
            Target::All => true,
            Target::AllExcept(connection_id) => connection_id != &self.connection_id,
            Target::Room { room, except } => {
                if except.as_deref() == Some(self.connection_id.as_str()) {
                    return false;
                }
                self.room.as_deref() == Some(room.as_str())
            }
        }
    }
}
