// Auto-subscribed feed - republishes system data and flow state from the raw stream
use crate::domain::flow::FlowState;
use crate::domain::message::{classify_feed, FeedMessage};
use crate::domain::telemetry::SystemDataMessage;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

struct FeedChannels {
    system_tx: watch::Sender<Option<SystemDataMessage>>,
    flow_tx: watch::Sender<Option<FlowState>>,
}

impl FeedChannels {
    fn ingest(&self, value: &Value) {
        match classify_feed(value) {
            FeedMessage::System(msg) => {
                self.system_tx.send_replace(Some(msg));
            }
            FeedMessage::Flow(state) => {
                tracing::debug!("Flow {} at index {}", state.flow_id, state.index);
                self.flow_tx.send_replace(Some(state));
            }
            FeedMessage::Other => {}
        }
    }
}

pub struct SystemFeed {
    channels: Arc<FeedChannels>,
    task: JoinHandle<()>,
}

impl SystemFeed {
    /// Runs until the raw stream's sender side is dropped.
    pub fn spawn(serial_number: String, mut raw_rx: broadcast::Receiver<Value>) -> Self {
        let (system_tx, _) = watch::channel(None);
        let (flow_tx, _) = watch::channel(None);
        let channels = Arc::new(FeedChannels { system_tx, flow_tx });

        let feed_channels = channels.clone();
        let task = tokio::spawn(async move {
            loop {
                match raw_rx.recv().await {
                    Ok(value) => feed_channels.ingest(&value),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "System feed for {} lagged, skipped {} messages",
                            serial_number,
                            skipped
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("System feed for {} stopped", serial_number);
        });

        Self { channels, task }
    }

    pub fn system_data(&self) -> watch::Receiver<Option<SystemDataMessage>> {
        self.channels.system_tx.subscribe()
    }

    pub fn flow_state(&self) -> watch::Receiver<Option<FlowState>> {
        self.channels.flow_tx.subscribe()
    }
}

impl Drop for SystemFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}
