// mpsc-backed transport feeding a socket writer
use crate::application::data_channel::DataChannelTransport;
use crate::domain::message::Command;
use crate::errors::BridgeError;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub struct ChannelTransport {
    serial_number: String,
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(serial_number: String, buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { serial_number, tx }, rx)
    }
}

#[async_trait]
impl DataChannelTransport for ChannelTransport {
    async fn send(&self, command: &Command) -> Result<(), BridgeError> {
        let frame = command.to_json()?;
        // Never wait on a stalled writer
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BridgeError::ChannelFull {
                serial: self.serial_number.clone(),
            },
            mpsc::error::TrySendError::Closed(_) => BridgeError::ChannelClosed {
                serial: self.serial_number.clone(),
            },
        })
    }
}
