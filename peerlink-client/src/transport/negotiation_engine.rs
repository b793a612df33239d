use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use peerlink_core::{IceCandidate, RtcConfig, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::call::LocalTrack;
use crate::transport::EngineEvent;

/// A bidirectional message channel attached to a negotiated session.
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> String;

    async fn send(&self, data: Bytes) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// The session-negotiation engine a [`Connection`](crate::Connection) drives.
///
/// Asynchronous happenings (local candidates, inbound channels and tracks,
/// channel lifecycle) are pushed into the event sender given at creation.
#[async_trait]
pub trait NegotiationEngine: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Creates a channel on the offering side. Its lifecycle events go to the engine's sender.
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>>;

    async fn add_track(&self, track: Arc<dyn LocalTrack>) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Builds one engine per connection.
#[async_trait]
pub trait EngineFactory: Send + Sync + 'static {
    async fn create(
        &self,
        config: &RtcConfig,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<Arc<dyn NegotiationEngine>>;
}
