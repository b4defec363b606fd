pub mod events;
pub mod handler;
pub mod registry;
pub mod relay;
pub mod rooms;
pub mod server;
pub mod session;
