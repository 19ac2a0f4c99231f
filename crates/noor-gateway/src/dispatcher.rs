use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

use noor_types::events::SessionEvent;
use noor_types::models::Role;

/// Capacity of the fan-out channel. Receivers that fall further behind skip events.
const BROADCAST_CAPACITY: usize = 1024;

/// A serialized event addressed to one session group.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub session_id: i64,
    pub json: Arc<str>,
}

impl Envelope {
    pub fn is_for(&self, session_id: i64) -> bool {
        self.session_id == session_id
    }
}

/// Manages all connected clients and fans events out to session groups.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every connection receives every envelope and keeps only its own group's
    broadcast_tx: broadcast::Sender<Envelope>,

    /// Live connections: session_id -> (conn_id -> role)
    groups: RwLock<HashMap<i64, HashMap<Uuid, Role>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                groups: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to all envelopes. Callers filter with [`Envelope::is_for`].
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event to a session group. Best-effort: nothing is queued for
    /// clients that are not connected right now.
    pub fn publish(&self, session_id: i64, event: &SessionEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize {} for session {}: {}", event.name(), session_id, e);
                return;
            }
        };

        let envelope = Envelope {
            session_id,
            json: json.into(),
        };
        match self.inner.broadcast_tx.send(envelope) {
            Ok(n) => debug!("{} -> session_{} ({} receivers)", event.name(), session_id, n),
            Err(_) => debug!("{} -> session_{} dropped, no receivers", event.name(), session_id),
        }
    }

    /// Register a connection in its session group and announce the new presence.
    pub async fn join(&self, session_id: i64, role: Role) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.inner
            .groups
            .write()
            .await
            .entry(session_id)
            .or_default()
            .insert(conn_id, role);

        self.publish_presence(session_id).await;
        conn_id
    }

    /// Remove a connection. Empty groups are dropped.
    pub async fn leave(&self, session_id: i64, conn_id: Uuid) {
        {
            let mut groups = self.inner.groups.write().await;
            if let Some(group) = groups.get_mut(&session_id) {
                group.remove(&conn_id);
                if group.is_empty() {
                    groups.remove(&session_id);
                }
            }
        }

        self.publish_presence(session_id).await;
    }

    /// (participant connections, whether any host connection is live)
    pub async fn presence(&self, session_id: i64) -> (usize, bool) {
        let groups = self.inner.groups.read().await;
        match groups.get(&session_id) {
            Some(group) => {
                let participants = group.values().filter(|r| **r == Role::Participant).count();
                let host = group.values().any(|r| *r == Role::Host);
                (participants, host)
            }
            None => (0, false),
        }
    }

    async fn publish_presence(&self, session_id: i64) {
        let (participant_count, host_connected) = self.presence(session_id).await;
        self.publish(
            session_id,
            &SessionEvent::PresenceUpdate {
                participant_count,
                host_connected,
            },
        );
    }
}
