//! Client struct definition
//!
//! Represents one registered connection as held by the registry.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::Delivery;
use crate::types::{ConnId, Nickname};

/// Registered client entry
///
/// Holds the connection identity, its current nickname, and the delivery
/// channel into that connection's event loop. Created on first successful
/// registration and dropped on removal.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this connection
    pub id: ConnId,
    /// Currently registered nickname
    pub nickname: Nickname,
    /// Registry → Connection delivery channel
    pub sender: mpsc::UnboundedSender<Delivery>,
}

impl Client {
    /// Create a new entry for a freshly registered connection
    pub fn new(id: ConnId, nickname: Nickname, sender: mpsc::UnboundedSender<Delivery>) -> Self {
        Self {
            id,
            nickname,
            sender,
        }
    }

    /// Push a delivery into this client's channel
    ///
    /// Never blocks; returns an error if the channel is closed (client
    /// disconnected).
    pub fn deliver(&self, delivery: Delivery) -> Result<(), SendError> {
        self.sender
            .send(delivery)
            .map_err(|_| SendError::ChannelClosed)
    }
}
