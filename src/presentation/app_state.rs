// Application state for HTTP handlers
use crate::application::analytics_service::AnalyticsService;
use crate::application::bridge_registry::BridgeRegistry;
use crate::application::flow_service::FlowService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BridgeRegistry>,
    pub flow_service: FlowService,
    pub analytics_service: AnalyticsService,
    /// Capacity of each robot's outbound frame buffer.
    pub outbound_buffer: usize,
}
