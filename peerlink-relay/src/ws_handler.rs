use axum::extract::State;
use axum::extract::WebSocketUpgrade;
use axum::extract::ws::{Message, WebSocket};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use peerlink_core::{PeerId, RelayMessage};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::RelayService;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RelayService) {
    info!("New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut registered: Option<PeerId> = None;

    loop {
        tokio::select! {
            _ = (&mut send_task) => break,

            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<RelayMessage>(&text) {
                    Ok(message) => handle_message(&service, &tx, &mut registered, message),
                    Err(e) => {
                        warn!("Invalid relay message from {:?}: {}", registered, e);
                        reply(&tx, RelayMessage::Error {
                            message: format!("malformed message: {e}"),
                        });
                    }
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    send_task.abort();

    if let Some(peer_id) = registered {
        service.remove_peer(&peer_id, &tx);
        info!("WebSocket disconnected: {}", peer_id);
    } else {
        info!("WebSocket disconnected before registering");
    }
}

fn handle_message(
    service: &RelayService,
    tx: &mpsc::UnboundedSender<Message>,
    registered: &mut Option<PeerId>,
    message: RelayMessage,
) {
    match message {
        RelayMessage::Register { peer_id } => {
            if let Some(previous) = registered.take() {
                service.remove_peer(&previous, tx);
            }
            info!("Peer {} registered", peer_id);
            service.add_peer(peer_id.clone(), tx.clone());
            *registered = Some(peer_id);
            reply(tx, RelayMessage::Registered);
        }

        RelayMessage::Signal {
            target: Some(target),
            signal,
            ..
        } => {
            let Some(from) = registered.clone() else {
                reply(tx, RelayMessage::Error {
                    message: "register before signaling".into(),
                });
                return;
            };
            if !service.send_to(&target, &RelayMessage::signal_from(from, signal)) {
                reply(tx, RelayMessage::Error {
                    message: format!("peer {target} is not connected"),
                });
            }
        }

        RelayMessage::Signal { target: None, .. } => {
            reply(tx, RelayMessage::Error {
                message: "signal without target".into(),
            });
        }

        other => {
            warn!("Unexpected {} message from {:?}", other.type_tag(), registered);
            reply(tx, RelayMessage::Error {
                message: format!("unexpected message type {}", other.type_tag()),
            });
        }
    }
}

fn reply(tx: &mpsc::UnboundedSender<Message>, message: RelayMessage) {
    if let Ok(json) = serde_json::to_string(&message) {
        let _ = tx.send(Message::Text(json.into()));
    }
}
