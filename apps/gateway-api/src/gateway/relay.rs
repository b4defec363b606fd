//! Façade the notification service uses to push realtime events at users.
//!
//! Delivery is best-effort. The persisted notification record is the source
//! of truth; a recipient who was offline learns about it by querying the
//! store later, never through this channel retroactively.

use serde_json::Value;

use super::events::ServerEvent;
use super::rooms::RoomRouter;

#[derive(Clone)]
pub struct NotificationRelay {
    router: RoomRouter,
}

impl NotificationRelay {
    pub fn new(router: RoomRouter) -> Self {
        Self { router }
    }

    /// Push a freshly persisted notification at one user.
    pub fn notify_user(&self, user_id: &str, notification: Value) {
        self.router
            .send_to_user(user_id, ServerEvent::notification_new(notification));
    }

    /// Push the same notification at several users.
    pub fn notify_users<'a>(
        &self,
        user_ids: impl IntoIterator<Item = &'a str>,
        notification: Value,
    ) {
        self.router
            .send_to_users(user_ids, ServerEvent::notification_new(notification));
    }

    /// Sync one read notification to the user's other devices.
    pub fn notify_read(&self, user_id: &str, notification_id: &str) {
        self.router
            .send_to_user(user_id, ServerEvent::notification_read(notification_id));
    }

    /// Sync a mark-all-read to the user's other devices.
    pub fn notify_all_read(&self, user_id: &str) {
        self.router
            .send_to_user(user_id, ServerEvent::notification_all_read());
    }
}
