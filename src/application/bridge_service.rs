// Data-channel bridge - one real-time connection per robot
use crate::application::data_channel::{DataChannelTransport, Dispatch};
use crate::application::system_feed::SystemFeed;
use crate::domain::flow::FlowState;
use crate::domain::message::{classify, commands, Command, Inbound, SubscribeInterval, Topic};
use crate::domain::telemetry::{LidarData, RobotPosition, SystemDataMessage};
use crate::errors::BridgeError;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Wait before subscribing so the peer's auto-subscribe can settle.
    pub subscribe_delay: Duration,
    pub lidar_interval_ms: u64,
    pub event_buffer: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            subscribe_delay: Duration::from_millis(1500),
            lidar_interval_ms: 300,
            event_buffer: 64,
        }
    }
}

/// Outbound transport plus the topics subscribed through it, one entry per
/// subscribe issued. Held under one lock so a disconnect takes both at once.
struct Connection {
    transport: Arc<dyn DataChannelTransport>,
    subscriptions: Vec<Topic>,
}

pub struct DataChannelBridge {
    serial_number: String,
    settings: BridgeSettings,
    connection: Mutex<Option<Connection>>,
    pending_subscribe: Mutex<Option<JoinHandle<()>>>,
    position_tx: watch::Sender<Option<RobotPosition>>,
    lidar_tx: watch::Sender<Option<LidarData>>,
    raw_tx: broadcast::Sender<Value>,
    feed: SystemFeed,
}

impl DataChannelBridge {
    pub fn new(serial_number: impl Into<String>, settings: BridgeSettings) -> Arc<Self> {
        let serial_number = serial_number.into();
        let (position_tx, _) = watch::channel(None);
        let (lidar_tx, _) = watch::channel(None);
        let (raw_tx, raw_rx) = broadcast::channel(settings.event_buffer.max(1));
        let feed = SystemFeed::spawn(serial_number.clone(), raw_rx);

        Arc::new(Self {
            serial_number,
            settings,
            connection: Mutex::new(None),
            pending_subscribe: Mutex::new(None),
            position_tx,
            lidar_tx,
            raw_tx,
            feed,
        })
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    fn connection(&self) -> MutexGuard<'_, Option<Connection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending_subscribe(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending_subscribe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    fn current_transport(&self) -> Option<Arc<dyn DataChannelTransport>> {
        self.connection().as_ref().map(|c| c.transport.clone())
    }

    /// Attach the outbound transport and schedule the default subscriptions.
    pub fn on_connected(
        self: &Arc<Self>,
        transport: Arc<dyn DataChannelTransport>,
    ) -> Result<(), BridgeError> {
        {
            let mut connection = self.connection();
            if connection.is_some() {
                return Err(BridgeError::AlreadyConnected {
                    serial: self.serial_number.clone(),
                });
            }
            *connection = Some(Connection {
                transport,
                subscriptions: Vec::new(),
            });
        }
        tracing::info!("Data channel connected for {}", self.serial_number);

        let bridge = Arc::downgrade(self);
        let delay = self.settings.subscribe_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(bridge) = bridge.upgrade() {
                bridge.subscribe_defaults().await;
            }
        });

        if let Some(previous) = self.pending_subscribe().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn subscribe_defaults(&self) {
        let defaults = [
            (Topic::Odometry, SubscribeInterval::Realtime),
            (
                Topic::Lidar,
                SubscribeInterval::Millis(self.settings.lidar_interval_ms),
            ),
        ];
        for (topic, interval) in defaults {
            if let Err(e) = self.subscribe(topic, interval).await {
                tracing::warn!(
                    "Subscribe to {} failed for {}: {}",
                    topic.as_str(),
                    self.serial_number,
                    e
                );
            }
        }
    }

    /// Cancel the pending subscribe, unsubscribe everything issued, drop the transport.
    pub async fn on_disconnected(&self) {
        if let Some(handle) = self.pending_subscribe().take() {
            handle.abort();
        }

        let Some(Connection {
            transport,
            subscriptions,
        }) = self.connection().take()
        else {
            return;
        };
        for topic in subscriptions {
            if let Err(e) = transport.send(&commands::unsubscribe(topic)).await {
                tracing::warn!(
                    "Unsubscribe from {} failed for {}: {}",
                    topic.as_str(),
                    self.serial_number,
                    e
                );
            }
        }
        tracing::info!("Data channel disconnected for {}", self.serial_number);
    }

    pub async fn shutdown(&self) {
        self.on_disconnected().await;
    }

    /// Parse a text frame and dispatch it. Undecodable frames are dropped.
    pub fn handle_frame(&self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.handle_inbound(value),
            Err(e) => {
                tracing::warn!("Dropping undecodable frame from {}: {}", self.serial_number, e);
            }
        }
    }

    pub fn handle_inbound(&self, value: Value) {
        if !value.is_object() {
            tracing::warn!("Dropping non-object message from {}", self.serial_number);
            return;
        }
        match classify(value) {
            Inbound::Position(position) => {
                self.position_tx.send_replace(Some(position));
            }
            Inbound::Lidar(scan) => {
                self.lidar_tx.send_replace(Some(scan));
            }
            Inbound::Incomplete => {
                tracing::debug!("Ignoring incomplete telemetry from {}", self.serial_number);
            }
            Inbound::Passthrough(value) => {
                // No receivers only means nobody is listening yet
                let _ = self.raw_tx.send(value);
            }
        }
    }

    pub async fn send_command(&self, command: &Command) -> Result<Dispatch, BridgeError> {
        let Some(transport) = self.current_transport() else {
            tracing::warn!(
                "Not connected to {}, dropping command m={:?} c={:?}",
                self.serial_number,
                command.module(),
                command.class()
            );
            return Ok(Dispatch::Dropped);
        };
        tracing::info!(
            "Sending to {}: m={:?} c={:?}",
            self.serial_number,
            command.module(),
            command.class()
        );
        transport.send(command).await?;
        Ok(Dispatch::Sent)
    }

    pub async fn subscribe(
        &self,
        topic: Topic,
        interval: SubscribeInterval,
    ) -> Result<Dispatch, BridgeError> {
        // Recorded under the same lock that hands out the transport
        let transport = self.connection().as_mut().map(|c| {
            c.subscriptions.push(topic);
            c.transport.clone()
        });
        let Some(transport) = transport else {
            tracing::warn!(
                "Not connected to {}, skipping subscribe to {}",
                self.serial_number,
                topic.as_str()
            );
            return Ok(Dispatch::Dropped);
        };
        transport.send(&commands::subscribe(topic, interval)).await?;
        Ok(Dispatch::Sent)
    }

    pub async fn unsubscribe(&self, topic: Topic) -> Result<Dispatch, BridgeError> {
        let transport = self.connection().as_mut().map(|c| {
            if let Some(pos) = c.subscriptions.iter().position(|t| *t == topic) {
                c.subscriptions.remove(pos);
            }
            c.transport.clone()
        });
        let Some(transport) = transport else {
            tracing::warn!(
                "Not connected to {}, skipping unsubscribe from {}",
                self.serial_number,
                topic.as_str()
            );
            return Ok(Dispatch::Dropped);
        };
        transport.send(&commands::unsubscribe(topic)).await?;
        Ok(Dispatch::Sent)
    }

    pub async fn start_flow(&self, flow_id: &str) -> Result<Dispatch, BridgeError> {
        self.send_command(&commands::flow_start(flow_id)).await
    }

    pub async fn stop_flow(&self) -> Result<Dispatch, BridgeError> {
        self.send_command(&commands::flow_stop()).await
    }

    pub async fn pause_flow(&self) -> Result<Dispatch, BridgeError> {
        self.send_command(&commands::flow_pause()).await
    }

    pub async fn resume_flow(&self) -> Result<Dispatch, BridgeError> {
        self.send_command(&commands::flow_resume()).await
    }

    /// Flow-stop, zero velocity, then system emergency-stop. Failures do not
    /// break the sequence.
    pub async fn emergency_stop(&self) -> Dispatch {
        let Some(transport) = self.current_transport() else {
            tracing::warn!("Not connected to {}, emergency stop not sent", self.serial_number);
            return Dispatch::Dropped;
        };
        tracing::warn!("Emergency stop requested for {}", self.serial_number);

        let sequence = [
            commands::flow_stop(),
            commands::zero_velocity(),
            commands::emergency_stop(),
        ];
        for command in &sequence {
            if let Err(e) = transport.send(command).await {
                tracing::error!(
                    "Emergency stop step {:?} failed for {}: {}",
                    command.class(),
                    self.serial_number,
                    e
                );
            }
        }
        Dispatch::Sent
    }

    pub fn position(&self) -> watch::Receiver<Option<RobotPosition>> {
        self.position_tx.subscribe()
    }

    pub fn lidar(&self) -> watch::Receiver<Option<LidarData>> {
        self.lidar_tx.subscribe()
    }

    pub fn system_data(&self) -> watch::Receiver<Option<SystemDataMessage>> {
        self.feed.system_data()
    }

    pub fn flow_state(&self) -> watch::Receiver<Option<FlowState>> {
        self.feed.flow_state()
    }

    pub fn raw_events(&self) -> broadcast::Receiver<Value> {
        self.raw_tx.subscribe()
    }

    pub fn latest_position(&self) -> Option<RobotPosition> {
        *self.position_tx.borrow()
    }

    pub fn latest_lidar(&self) -> Option<LidarData> {
        self.lidar().borrow().clone()
    }

    pub fn latest_system_data(&self) -> Option<SystemDataMessage> {
        self.system_data().borrow().clone()
    }

    pub fn latest_flow_state(&self) -> Option<FlowState> {
        self.flow_state().borrow().clone()
    }
}
