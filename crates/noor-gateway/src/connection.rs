use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, trace, warn};

use noor_types::events::SessionEvent;
use noor_types::models::{Role, group_name};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a WebSocket whose session token was validated at the HTTP upgrade.
///
/// Sends `Ready`, joins the session group, then relays the group's events
/// until either side goes away.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, session_id: i64, role: Role) {
    let (mut sender, mut receiver) = socket.split();
    let group = group_name(session_id);

    // Subscribe before Ready so nothing published after it is missed
    let mut broadcast_rx = dispatcher.subscribe();

    let ready = SessionEvent::Ready { session_id, role };
    match serde_json::to_string(&ready) {
        Ok(text) => {
            if sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        Err(e) => {
            warn!("Failed to serialize Ready for {}: {}", group, e);
            return;
        }
    }

    let conn_id = dispatcher.join(session_id, role).await;
    info!("{} connection {} joined {}", role.as_str(), conn_id, group);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward the group's events to the client, with heartbeat
    let send_group = group.clone();
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let envelope = match result {
                        Ok(envelope) => envelope,
                        Err(RecvError::Lagged(n)) => {
                            warn!("{} receiver lagged by {} events", send_group, n);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    if !envelope.is_for(session_id) {
                        continue;
                    }

                    if sender.send(Message::Text(envelope.json.to_string().into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout on {} (missed {} pongs), dropping connection", send_group, missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Clients only listen; inbound traffic is heartbeat and close frames
    let recv_group = group.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                Message::Text(text) => {
                    trace!("{} ignoring {} bytes of client text", recv_group, text.as_str().len());
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.leave(session_id, conn_id).await;
    info!("{} connection {} left {}", role.as_str(), conn_id, group);
}
