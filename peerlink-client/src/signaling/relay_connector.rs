use async_trait::async_trait;
use futures::{Sink, Stream};
use peerlink_core::TransportError;
use std::pin::Pin;

/// Outbound half of a relay session: one text frame per message.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a relay session. Ends when the relay drops the session.
///
/// `Err(TransportError::Malformed)` marks a single unreadable frame; any other
/// error ends the session.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// Opens message-oriented sessions to a signaling relay.
///
/// The signaling channel only needs connect/send/receive/close; anything that
/// can move text frames both ways can stand in for the relay transport.
#[async_trait]
pub trait RelayConnector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), TransportError>;
}
