use lobby_system::{ConnectionId, ServerMessage};
use std::collections::HashMap;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ServerMessage>;

pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs.insert(connection_id, tx);
    }

    pub async fn send(&mut self, to: &ConnectionId, message: ServerMessage) {
        if let Some(tx) = self.connection_txs.get_mut(to) {
            if tx.send(message).await.is_err() {
                log::warn!("Connection {} is gone, dropping egress", to);
            }
        } else {
            log::warn!("No channel for connection {}", to);
        }
    }

    pub async fn broadcast(&mut self, message: &ServerMessage) {
        for (connection_id, tx) in self.connection_txs.iter_mut() {
            if tx.send(message.clone()).await.is_err() {
                log::warn!("Connection {} is gone, dropping egress", connection_id);
            }
        }
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connection_txs.len()
    }
}
