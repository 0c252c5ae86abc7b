use crate::application::bridge_service::BridgeSettings;
use crate::domain::flow::Flow;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub channel: ChannelSettings,
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelSettings {
    #[serde(default = "default_subscribe_delay_ms")]
    pub subscribe_delay_ms: u64,
    #[serde(default = "default_lidar_interval_ms")]
    pub lidar_interval_ms: u64,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            subscribe_delay_ms: default_subscribe_delay_ms(),
            lidar_interval_ms: default_lidar_interval_ms(),
            event_buffer: default_event_buffer(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

impl ChannelSettings {
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            subscribe_delay: Duration::from_millis(self.subscribe_delay_ms),
            lidar_interval_ms: self.lidar_interval_ms,
            event_buffer: self.event_buffer,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsSettings {
    pub base_url: String,
    pub fixture_path: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_word_limit")]
    pub word_limit: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FlowsConfig {
    #[serde(default)]
    pub flows: Vec<Flow>,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_subscribe_delay_ms() -> u64 {
    1500
}

fn default_lidar_interval_ms() -> u64 {
    300
}

fn default_event_buffer() -> usize {
    64
}

fn default_outbound_buffer() -> usize {
    32
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_word_limit() -> usize {
    50
}

pub const BRIDGE_CONFIG_PATH: &str = "config/bridge.toml";
pub const FLOWS_CONFIG_PATH: &str = "config/flows.toml";

pub fn load_bridge_config() -> anyhow::Result<BridgeConfig> {
    load_bridge_config_from(Path::new(BRIDGE_CONFIG_PATH))
}

/// File values can be overridden through `TELEOP__SECTION__KEY` variables.
pub fn load_bridge_config_from(path: &Path) -> anyhow::Result<BridgeConfig> {
    load_bridge_config_with(path, env_overrides())
}

fn env_overrides() -> config::Environment {
    config::Environment::with_prefix("TELEOP")
        .separator("__")
        .try_parsing(true)
}

fn load_bridge_config_with(
    path: &Path,
    env: config::Environment,
) -> anyhow::Result<BridgeConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env)
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_flows_config() -> anyhow::Result<FlowsConfig> {
    load_flows_config_from(Path::new(FLOWS_CONFIG_PATH))
}

/// The flow catalog is optional; a missing file yields an empty catalog.
pub fn load_flows_config_from(path: &Path) -> anyhow::Result<FlowsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
