// Bridge registry - one bridge per robot serial number
use crate::application::bridge_service::{BridgeSettings, DataChannelBridge};
use crate::application::data_channel::DataChannelTransport;
use crate::errors::BridgeError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub struct BridgeRegistry {
    settings: BridgeSettings,
    bridges: RwLock<HashMap<String, Arc<DataChannelBridge>>>,
}

impl BridgeRegistry {
    pub fn new(settings: BridgeSettings) -> Self {
        Self {
            settings,
            bridges: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, serial_number: &str) -> Option<Arc<DataChannelBridge>> {
        self.bridges
            .read()
            .ok()
            .and_then(|b| b.get(serial_number).cloned())
    }

    /// Only a robot connection creates a bridge; the bridge then outlives the
    /// connection so its last values stay readable.
    fn get_or_create(&self, serial_number: &str) -> Arc<DataChannelBridge> {
        if let Some(bridge) = self.get(serial_number) {
            return bridge;
        }
        let mut bridges = match self.bridges.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        bridges
            .entry(serial_number.to_string())
            .or_insert_with(|| DataChannelBridge::new(serial_number, self.settings.clone()))
            .clone()
    }

    pub fn attach(
        &self,
        serial_number: &str,
        transport: Arc<dyn DataChannelTransport>,
    ) -> Result<Arc<DataChannelBridge>, BridgeError> {
        let bridge = self.get_or_create(serial_number);
        bridge.on_connected(transport)?;
        Ok(bridge)
    }

    pub async fn detach(&self, serial_number: &str) {
        if let Some(bridge) = self.get(serial_number) {
            bridge.on_disconnected().await;
        }
    }

    pub fn connected_serials(&self) -> Vec<String> {
        let mut serials: Vec<String> = self
            .bridges
            .read()
            .map(|b| {
                b.values()
                    .filter(|bridge| bridge.is_connected())
                    .map(|bridge| bridge.serial_number().to_string())
                    .collect()
            })
            .unwrap_or_default();
        serials.sort();
        serials
    }

    pub async fn shutdown(&self) {
        let bridges: Vec<Arc<DataChannelBridge>> = self
            .bridges
            .read()
            .map(|b| b.values().cloned().collect())
            .unwrap_or_default();
        for bridge in bridges {
            bridge.shutdown().await;
        }
    }
}
