use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use lobby_system::{
    serde_json, ClientMessage, ConnectionId, JoinRequest, LobbyError, ServerMessage, SessionId,
};

use crate::connection_tx_storage::ConnectionTx;
use crate::registry::SessionRegistry;
use crate::session::{SessionMessage, SessionTx};

#[derive(Clone)]
struct Membership {
    session_id: SessionId,
    session_tx: SessionTx,
}

enum Forward {
    Session {
        to: Membership,
        message: SessionMessage,
    },
    Reply(ServerMessage),
}

/// Routes the commands of one connection to the session it joined.
///
/// Everything leaves through a single forwarding task, so a connection's
/// commands reach sessions in the order they arrived and a full session
/// mailbox only delays them.
pub struct Dispatcher {
    connection_id: ConnectionId,
    connection_tx: ConnectionTx,
    registry: Arc<SessionRegistry>,
    membership: Option<Membership>,
    forward_tx: UnboundedSender<Forward>,
}

fn spawn_forwarder(
    connection_id: ConnectionId,
    mut connection_tx: ConnectionTx,
) -> UnboundedSender<Forward> {
    let (forward_tx, mut forward_rx) = unbounded_channel::<Forward>();

    tokio::spawn(async move {
        while let Some(forward) = forward_rx.recv().await {
            match forward {
                Forward::Session { mut to, message } => {
                    if to.session_tx.send(message).await.is_err() {
                        log::error!(
                            "Session {:?} is gone, dropping command from {}",
                            to.session_id,
                            connection_id
                        );
                    }
                }
                Forward::Reply(message) => {
                    if connection_tx.send(message).await.is_err() {
                        log::warn!("Connection {} is gone, dropping egress", connection_id);
                    }
                }
            }
        }
        log::debug!("Forwarder of connection {} terminated", connection_id);
    });

    forward_tx
}

impl Dispatcher {
    pub fn new(
        connection_id: ConnectionId,
        connection_tx: ConnectionTx,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        let forward_tx = spawn_forwarder(connection_id, connection_tx.clone());
        Self {
            connection_id,
            connection_tx,
            registry,
            membership: None,
            forward_tx,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.membership.as_ref().map(|m| m.session_id.as_str())
    }

    /// Undecodable frames are dropped; the connection stays usable.
    pub fn dispatch_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.dispatch(message),
            Err(e) => log::warn!(
                "Dropping undecodable frame from {}: {}",
                self.connection_id,
                e
            ),
        }
    }

    pub fn dispatch(&mut self, message: ClientMessage) {
        let from = self.connection_id;
        match message {
            ClientMessage::Join(request) => self.join(request),
            ClientMessage::LocationUpdate(location) => {
                self.forward(SessionMessage::LocationUpdate { from, location })
            }
            ClientMessage::SetUpdateInterval { ms } => {
                self.forward(SessionMessage::SetUpdateInterval { from, ms })
            }
            ClientMessage::DrawRegion(region) => {
                self.forward(SessionMessage::DrawRegion { from, region })
            }
            ClientMessage::Leave => self.leave(),
        }
    }

    /// Leaves the current session, if any. Safe to call more than once.
    pub fn leave(&mut self) {
        let from = self.connection_id;
        if let Some(membership) = self.membership.take() {
            self.enqueue(Forward::Session {
                to: membership,
                message: SessionMessage::Leave { from },
            });
        }
    }

    fn join(&mut self, request: JoinRequest) {
        if request.display_name().is_none() {
            self.reject(LobbyError::InvalidJoin);
            return;
        }

        let switching = self
            .membership
            .as_ref()
            .map_or(false, |m| m.session_id != request.session_id);
        if switching {
            self.leave();
        }

        let session_tx = self.registry.get_or_create(&request.session_id);
        self.membership = Some(Membership {
            session_id: request.session_id.clone(),
            session_tx,
        });
        self.forward(SessionMessage::Join {
            from: self.connection_id,
            tx: self.connection_tx.clone(),
            request,
        });
    }

    fn forward(&mut self, message: SessionMessage) {
        match self.membership.clone() {
            Some(to) => self.enqueue(Forward::Session { to, message }),
            None => log::warn!(
                "Dropping command from {}: {}",
                self.connection_id,
                LobbyError::UnknownConnection(self.connection_id)
            ),
        }
    }

    fn reject(&mut self, error: LobbyError) {
        log::warn!("Rejecting command from {}: {}", self.connection_id, error);
        self.enqueue(Forward::Reply(ServerMessage::Error {
            kind: error.kind(),
            message: error.to_string(),
        }));
    }

    fn enqueue(&self, forward: Forward) {
        if self.forward_tx.send(forward).is_err() {
            log::error!("Forwarder of connection {} is gone", self.connection_id);
        }
    }
}
