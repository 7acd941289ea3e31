//! `/hubs/packets`: a bidirectional websocket exposing the fan-out
//! subscription protocol. Three tasks per connection (read / write /
//! subscription-and-broadcast) manage per-connection `all`/callsign/area
//! broadcast group subscriptions.

use super::dto::PacketDto;
use super::AppState;
use crate::domain::Packet;
use crate::fanout;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Client-invokable subscription methods, tagged on the wire by
/// `method` so a single text frame round-trips through `serde_json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method")]
enum ClientMessage {
    #[serde(rename = "subscribe_all")]
    SubscribeAll,
    #[serde(rename = "unsubscribe_all")]
    UnsubscribeAll,
    #[serde(rename = "subscribe_callsign")]
    SubscribeCallsign { callsign: String },
    #[serde(rename = "unsubscribe_callsign")]
    UnsubscribeCallsign { callsign: String },
    #[serde(rename = "subscribe_area")]
    SubscribeArea {
        latitude: f64,
        longitude: f64,
        #[serde(default = "default_radius_km")]
        radius_km: f64,
    },
    #[serde(rename = "unsubscribe_area")]
    UnsubscribeArea { latitude: f64, longitude: f64 },
}

fn default_radius_km() -> f64 {
    50.0
}

/// What the write task puts on the wire: either a fan-out delivery
/// (`receive_packet`) or a protocol-level error with a message field.
#[derive(Serialize)]
#[serde(tag = "event")]
enum ServerMessage {
    #[serde(rename = "receive_packet")]
    ReceivePacket { packet: PacketDto },
    #[serde(rename = "error")]
    Error { message: String },
}

pub async fn packets_websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("new /hubs/packets connection");
    metrics::gauge!("websocket.connections").increment(1.0);

    let (sender, receiver) = socket.split();
    let (client_tx, client_rx) = flume::unbounded::<ClientMessage>();
    let (out_tx, out_rx) = flume::unbounded::<ServerMessage>();

    let read_task = tokio::spawn(read_loop(receiver, client_tx));
    let write_task = tokio::spawn(write_loop(sender, out_rx));
    let subscription_task = tokio::spawn(subscription_loop(state.fanout.clone(), client_rx, out_tx));

    tokio::select! {
        _ = read_task => {}
        _ = write_task => {}
        _ = subscription_task => {}
    }

    metrics::gauge!("websocket.connections").decrement(1.0);
    info!("/hubs/packets connection closed");
}

async fn read_loop(
    mut receiver: futures_util::stream::SplitStream<WebSocket>,
    client_tx: flume::Sender<ClientMessage>,
) {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(parsed) => {
                    if client_tx.send(parsed).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, text = %text, "unparseable subscription message");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "websocket read error");
                break;
            }
        }
    }
}

async fn write_loop(
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
    out_rx: flume::Receiver<ServerMessage>,
) {
    while let Ok(message) = out_rx.recv_async().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize outgoing websocket message");
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

/// Owns this connection's subscription set: which fan-out groups it has
/// joined, and the broadcast receivers backing them. Forwards every
/// delivery (and every subscription error) to the write task.
async fn subscription_loop(
    fanout: Arc<fanout::Fanout>,
    client_rx: flume::Receiver<ClientMessage>,
    out_tx: flume::Sender<ServerMessage>,
) {
    let mut receivers: HashMap<String, broadcast::Receiver<Arc<Packet>>> = HashMap::new();

    loop {
        tokio::select! {
            msg = client_rx.recv_async() => {
                match msg {
                    Ok(client_message) => {
                        if let Err(message) = apply(&fanout, &mut receivers, client_message).await
                            && out_tx.send(ServerMessage::Error { message }).is_err() {
                                return;
                            }
                    }
                    Err(_) => break,
                }
            }
            delivery = next_delivery(&mut receivers) => {
                if let Some(packet) = delivery
                    && out_tx.send(ServerMessage::ReceivePacket { packet: PacketDto::from(&packet) }).is_err() {
                        return;
                    }
            }
        }
    }

    for group in receivers.keys() {
        fanout.sweep(group).await;
    }
}

async fn next_delivery(
    receivers: &mut HashMap<String, broadcast::Receiver<Arc<Packet>>>,
) -> Option<Arc<Packet>> {
    if receivers.is_empty() {
        std::future::pending::<()>().await;
        return None;
    }

    let mut futures: Vec<_> = receivers
        .values_mut()
        .map(|rx| Box::pin(rx.recv()))
        .collect();
    let (result, _, _) = futures_util::future::select_all(futures.drain(..)).await;

    match result {
        Ok(packet) => Some(packet),
        Err(broadcast::error::RecvError::Closed) => None,
        Err(broadcast::error::RecvError::Lagged(n)) => {
            warn!(skipped = n, "websocket subscriber lagged, dropped packets");
            None
        }
    }
}

async fn apply(
    fanout: &Arc<fanout::Fanout>,
    receivers: &mut HashMap<String, broadcast::Receiver<Arc<Packet>>>,
    message: ClientMessage,
) -> Result<(), String> {
    match message {
        ClientMessage::SubscribeAll => {
            let group = fanout::all_group();
            receivers.insert(group.clone(), fanout.subscribe(&group).await);
            Ok(())
        }
        ClientMessage::UnsubscribeAll => {
            let group = fanout::all_group();
            receivers.remove(&group);
            fanout.sweep(&group).await;
            Ok(())
        }
        ClientMessage::SubscribeCallsign { callsign } => {
            let group = fanout::callsign_group(&fanout::normalize_callsign(&callsign).map_err(|e| e.to_string())?);
            receivers.insert(group.clone(), fanout.subscribe(&group).await);
            Ok(())
        }
        ClientMessage::UnsubscribeCallsign { callsign } => {
            let normalized = fanout::normalize_callsign(&callsign).map_err(|e| e.to_string())?;
            let group = fanout::callsign_group(&normalized);
            receivers.remove(&group);
            fanout.sweep(&group).await;
            Ok(())
        }
        ClientMessage::SubscribeArea { latitude, longitude, radius_km } => {
            let coord = fanout::validate_area(latitude, longitude, radius_km).map_err(|e| e.to_string())?;
            let (lat_cell, lon_cell) = coord.area_cell();
            let group = fanout::area_group(lat_cell, lon_cell);
            receivers.insert(group.clone(), fanout.subscribe(&group).await);
            Ok(())
        }
        ClientMessage::UnsubscribeArea { latitude, longitude } => {
            // Unsubscribe only needs a valid point, not a radius; a
            // nominal mid-range radius keeps it on the same validation path.
            let coord = fanout::validate_area(latitude, longitude, 1.0).map_err(|e| e.to_string())?;
            let (lat_cell, lon_cell) = coord.area_cell();
            let group = fanout::area_group(lat_cell, lon_cell);
            receivers.remove(&group);
            fanout.sweep(&group).await;
            Ok(())
        }
    }
}
