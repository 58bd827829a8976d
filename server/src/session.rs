use tokio::sync::mpsc::{channel, Sender};
use tokio::sync::oneshot;

use lobby_system::{
    Audience, ConnectionId, GeofenceRegion, JoinRequest, LobbyError, LobbyPolicy, LobbySession,
    Outbound, RawLocation, ServerMessage, SessionId, SessionSummary,
};

use crate::connection_tx_storage::{ConnectionTx, ConnectionTxStorage};

pub type SessionTx = Sender<SessionMessage>;

/// Mailbox item of a session actor.
#[derive(Debug)]
pub enum SessionMessage {
    Join {
        from: ConnectionId,
        tx: ConnectionTx,
        request: JoinRequest,
    },
    LocationUpdate {
        from: ConnectionId,
        location: RawLocation,
    },
    SetUpdateInterval {
        from: ConnectionId,
        ms: u64,
    },
    DrawRegion {
        from: ConnectionId,
        region: GeofenceRegion,
    },
    Leave {
        from: ConnectionId,
    },
    Describe {
        tx: oneshot::Sender<SessionSummary>,
    },
}

struct SessionActor {
    session: LobbySession,
    connections: ConnectionTxStorage,
}

impl SessionActor {
    fn new(session_id: SessionId, policy: LobbyPolicy) -> Self {
        Self {
            session: LobbySession::new(session_id, policy),
            connections: ConnectionTxStorage::new(),
        }
    }

    async fn handle(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Join { from, tx, request } => match self.session.join(from, &request) {
                Ok(result) => {
                    self.connections.insert(from, tx);
                    self.deliver(result.outbound).await;
                }
                Err(error) => {
                    log::warn!("Rejecting join from {}: {}", from, error);
                    let mut tx = tx;
                    let reply = ServerMessage::Error {
                        kind: error.kind(),
                        message: error.to_string(),
                    };
                    if tx.send(reply).await.is_err() {
                        log::warn!("Connection {} is gone, dropping egress", from);
                    }
                }
            },
            SessionMessage::LocationUpdate { from, location } => {
                let result = self.session.update_location(from, location);
                self.deliver_or_drop(from, result).await;
            }
            SessionMessage::SetUpdateInterval { from, ms } => {
                let result = self.session.set_update_interval(from, ms);
                self.deliver_or_drop(from, result).await;
            }
            SessionMessage::DrawRegion { from, region } => {
                let result = self.session.record_region(from, region);
                self.deliver_or_drop(from, result).await;
            }
            SessionMessage::Leave { from } => {
                self.connections.remove(&from);
                let outbound = self.session.leave(from);
                self.deliver(outbound).await;
            }
            SessionMessage::Describe { tx } => {
                let _ = tx.send(self.session.summary());
            }
        }
        debug_assert_eq!(self.connections.len(), self.session.presence().len());
    }

    async fn deliver_or_drop(
        &mut self,
        from: ConnectionId,
        result: Result<Vec<Outbound>, LobbyError>,
    ) {
        match result {
            Ok(outbound) => self.deliver(outbound).await,
            Err(error) => log::warn!(
                "Dropping command from {} in session {:?}: {}",
                from,
                self.session.session_id(),
                error
            ),
        }
    }

    async fn deliver(&mut self, outbound: Vec<Outbound>) {
        for Outbound { audience, message } in outbound {
            match audience {
                Audience::Everyone => self.connections.broadcast(&message).await,
                Audience::Only(to) => self.connections.send(&to, message).await,
            }
        }
    }
}

/// Spawns the task that owns one lobby and serializes everything sent to it.
pub fn spawn_session(session_id: SessionId, policy: LobbyPolicy, capacity: usize) -> SessionTx {
    let (session_tx, mut session_rx) = channel::<SessionMessage>(capacity.max(1));

    tokio::spawn(async move {
        log::info!("Session {:?} started", session_id);
        let mut actor = SessionActor::new(session_id, policy);

        while let Some(message) = session_rx.recv().await {
            actor.handle(message).await;
        }
        log::info!("Session {:?} terminated", actor.session.session_id());
    });

    session_tx
}
