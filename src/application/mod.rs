// Application layer - Services and the traits they depend on
pub mod analytics_repository;
pub mod analytics_service;
pub mod bridge_registry;
pub mod bridge_service;
pub mod data_channel;
pub mod flow_service;
pub mod system_feed;
