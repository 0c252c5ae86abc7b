// WebSocket endpoint the robot peer connects to
use crate::errors::{ApiError, BridgeError};
use crate::infrastructure::channel_transport::ChannelTransport;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

pub async fn channel_handler(
    ws: WebSocketUpgrade,
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    // Checked again on attach, this only spares a pointless upgrade
    if state
        .registry
        .get(&serial)
        .is_some_and(|bridge| bridge.is_connected())
    {
        return ApiError::from(BridgeError::AlreadyConnected { serial }).into_response();
    }

    ws.on_upgrade(move |socket| handle_channel(socket, serial, state))
}

async fn handle_channel(mut socket: WebSocket, serial: String, state: Arc<AppState>) {
    let (transport, mut outbound_rx) = ChannelTransport::new(serial.clone(), state.outbound_buffer);
    let bridge = match state.registry.attach(&serial, Arc::new(transport)) {
        Ok(bridge) => bridge,
        Err(e) => {
            tracing::warn!("Refusing data channel: {}", e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                match frame {
                    Some(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => bridge.handle_frame(&text),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => bridge.handle_frame(text),
                        Err(_) => tracing::debug!("Dropping non-UTF-8 frame from {}", serial),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("Data channel error for {}: {}", serial, e);
                        break;
                    }
                }
            }
        }
    }

    state.registry.detach(&serial).await;

    // Flush the unsubscribes queued during detach
    while let Ok(text) = outbound_rx.try_recv() {
        if sender.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
    let _ = sender.send(Message::Close(None)).await;
}
