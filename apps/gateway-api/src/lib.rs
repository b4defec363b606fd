pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;

use std::sync::Arc;

use config::Config;
use gateway::registry::ConnectionRegistry;
use gateway::relay::NotificationRelay;
use gateway::rooms::RoomRouter;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ConnectionRegistry>,
    pub router: RoomRouter,
    pub relay: NotificationRelay,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let router = RoomRouter::new();
        Self {
            config: Arc::new(config),
            registry: Arc::new(ConnectionRegistry::new()),
            relay: NotificationRelay::new(router.clone()),
            router,
        }
    }
}
