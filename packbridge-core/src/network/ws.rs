use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::{Dialer, Transport};
use crate::error::BridgeError;
use crate::protocol::Envelope;

/// One envelope per WebSocket text frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsDialer;

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self, address: &str) -> Result<Transport, BridgeError> {
        let (ws_stream, _) = connect_async(address)
            .await
            .map_err(|e| BridgeError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(BridgeError::from)
            .with(|env: Envelope| future::ready(env.to_json().map(|text| Message::Text(text.into()))));

        // Control frames are answered by tungstenite itself.
        let stream = read.filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Envelope::from_json(&text)),
                Ok(Message::Binary(bytes)) => Some(Envelope::from_slice(&bytes)),
                Ok(_) => None,
                Err(e) => Some(Err(BridgeError::from(e))),
            })
        });

        Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
    }
}
