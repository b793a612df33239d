use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use peerlink_core::{
    IceCandidate, IceServerConfig, RemoteTrack, RtcConfig, SdpRole, SessionDescription, TrackKind,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

use crate::call::LocalTrack;
use crate::transport::{DataChannel, EngineEvent, EngineFactory, NegotiationEngine};

/// Builds [`RtcEngine`]s backed by webrtc-rs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtcEngineFactory;

#[async_trait]
impl EngineFactory for RtcEngineFactory {
    async fn create(
        &self,
        config: &RtcConfig,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<Arc<dyn NegotiationEngine>> {
        Ok(Arc::new(RtcEngine::new(config, events).await?))
    }
}

/// Negotiation engine over an `RTCPeerConnection`.
pub struct RtcEngine {
    peer_connection: Arc<RTCPeerConnection>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl RtcEngine {
    pub async fn new(config: &RtcConfig, events: mpsc::UnboundedSender<EngineEvent>) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config.ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    info!("Peer connection state changed: {:?}", s);
                    if s == RTCPeerConnectionState::Failed {
                        let _ = tx.send(EngineEvent::Failed("peer connection failed".into()));
                    }
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = tx.send(EngineEvent::LocalCandidate(from_candidate_init(init)));
                    }
                    Err(e) => warn!("Cannot serialize local candidate: {}", e),
                }
            })
        }));

        let dc_tx = events.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            Box::pin(async move {
                debug!("Remote opened data channel '{}'", dc.label());
                let _ = tx.send(EngineEvent::DataChannel(Arc::new(RtcDataChannel(dc.clone()))));
                wire_channel(&dc, tx);
            })
        }));

        let track_tx = events.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => TrackKind::Audio,
                        RTPCodecType::Video => TrackKind::Video,
                        other => {
                            warn!("Ignoring remote track of kind {:?}", other);
                            return;
                        }
                    };
                    let remote = RemoteTrack {
                        id: track.id(),
                        stream_id: track.stream_id(),
                        kind,
                    };
                    debug!("Remote track {} ({:?}) arrived", remote.id, kind);
                    let _ = tx.send(EngineEvent::RemoteTracks(vec![remote]));
                })
            },
        ));

        Ok(Self {
            peer_connection,
            events,
        })
    }
}

#[async_trait]
impl NegotiationEngine for RtcEngine {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc_description(desc)?)
            .await
            .context("Failed to set local description")?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await
            .context("Failed to set remote description")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_candidate_init(candidate))
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>> {
        let dc = self
            .peer_connection
            .create_data_channel(label, None)
            .await
            .context("Failed to create data channel")?;
        wire_channel(&dc, self.events.clone());
        Ok(Arc::new(RtcDataChannel(dc)))
    }

    async fn add_track(&self, track: Arc<dyn LocalTrack>) -> Result<()> {
        let Some(rtp_track) = track.rtp_track() else {
            bail!("track {} has no RTP source", track.id());
        };
        let sender = self
            .peer_connection
            .add_track(rtp_track)
            .await
            .context("Failed to add track")?;

        // RTCP has to be drained for the interceptors to keep working.
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while sender.read(&mut rtcp_buf).await.is_ok() {}
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .context("Failed to close peer connection")?;
        Ok(())
    }
}

/// Data channel over webrtc-rs `RTCDataChannel`.
pub struct RtcDataChannel(Arc<RTCDataChannel>);

#[async_trait]
impl DataChannel for RtcDataChannel {
    fn label(&self) -> String {
        self.0.label().to_owned()
    }

    async fn send(&self, data: Bytes) -> Result<()> {
        self.0.send(&data).await.context("Failed to send message")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.0.close().await.context("Failed to close data channel")?;
        Ok(())
    }
}

fn wire_channel(dc: &Arc<RTCDataChannel>, events: mpsc::UnboundedSender<EngineEvent>) {
    let label = dc.label().to_owned();

    let tx_open = events.clone();
    dc.on_open(Box::new(move || {
        let tx = tx_open.clone();
        let label = label.clone();
        Box::pin(async move {
            info!("Data channel '{}' open", label);
            let _ = tx.send(EngineEvent::ChannelOpen);
        })
    }));

    let tx_msg = events.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx_msg.clone();
        Box::pin(async move {
            let _ = tx.send(EngineEvent::ChannelMessage(msg.data));
        })
    }));

    let tx_close = events.clone();
    dc.on_close(Box::new(move || {
        let tx = tx_close.clone();
        Box::pin(async move {
            let _ = tx.send(EngineEvent::ChannelClosed);
        })
    }));

    dc.on_error(Box::new(move |e| {
        let tx = events.clone();
        Box::pin(async move {
            let _ = tx.send(EngineEvent::ChannelError(e.to_string()));
        })
    }));
}

fn to_rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription> {
    let role = match desc.sdp_type {
        RTCSdpType::Offer => SdpRole::Offer,
        RTCSdpType::Answer => SdpRole::Answer,
        other => bail!("unsupported description type {other:?}"),
    };
    Ok(SessionDescription { role, sdp: desc.sdp })
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.role {
        SdpRole::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpRole::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

fn from_candidate_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_candidate_init(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}
