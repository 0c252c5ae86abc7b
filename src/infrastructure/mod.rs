// Infrastructure layer - External dependencies and adapters
pub mod analytics_http;
pub mod channel_transport;
pub mod config;
pub mod fixture_repository;
