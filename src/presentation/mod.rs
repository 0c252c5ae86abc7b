// Presentation layer - HTTP and WebSocket surface
pub mod app_state;
pub mod auth;
pub mod channel_socket;
pub mod handlers;
pub mod router;
