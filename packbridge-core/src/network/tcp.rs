use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use super::{Dialer, Transport};
use crate::codec::EnvelopeCodec;
use crate::error::BridgeError;

/// Newline-delimited JSON over a plain TCP stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, address: &str) -> Result<Transport, BridgeError> {
        let target = address.strip_prefix("tcp://").unwrap_or(address);
        let stream = TcpStream::connect(target)
            .await
            .map_err(|e| BridgeError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;

        let (sink, stream) = Framed::new(stream, EnvelopeCodec::default()).split();
        Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
    }
}
