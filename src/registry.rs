//! Registry actor implementation
//!
//! The central actor that owns the nickname registry: the only place the
//! identity -> nickname mapping is read or mutated. Uses the Actor pattern
//! with mpsc channels for message passing; each command carries a oneshot
//! reply sender, so callers get a synchronous round-trip while the actor
//! processes one command at a time (operations never interleave).

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::client::Client;
use crate::error::AppError;
use crate::message::{Delivery, BROADCAST};
use crate::types::{ConnId, Nickname};

/// Commands sent from connection handlers to the Registry actor
#[derive(Debug)]
pub enum RegistryCommand {
    /// Register a nickname for a connection, or rename it
    Register {
        conn_id: ConnId,
        nickname: Nickname,
        sender: mpsc::UnboundedSender<Delivery>,
        reply: oneshot::Sender<Result<RegisterOutcome, AppError>>,
    },
    /// Snapshot the registered nicknames
    List {
        reply: oneshot::Sender<Vec<String>>,
    },
    /// Relay a message to the named recipients (or `*` for broadcast)
    Send {
        conn_id: ConnId,
        recipients: Vec<String>,
        text: String,
        reply: oneshot::Sender<Result<SendOutcome, AppError>>,
    },
    /// Drop a connection's registration
    Remove {
        conn_id: ConnId,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
}

/// Successful registration result
///
/// Both names of a rename are reported so the caller can build its reply
/// line and the log entry carries the full transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// First registration for this connection
    Registered(Nickname),
    /// Nickname changed; identity unchanged
    Renamed { old: Nickname, new: Nickname },
}

/// Successful send result, echoing how the message was routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Delivered to every registered connection except the sender
    Broadcast,
    /// Delivered to the registered subset of the listed recipients
    Direct(Vec<String>),
}

/// The Registry actor
///
/// Holds the identity -> entry map and the inverse nickname -> identity
/// index, kept in sync on every mutation. Nicknames are unique across live
/// entries; an identity appears at most once.
pub struct Registry {
    /// All registered connections: ConnId -> Client
    clients: HashMap<ConnId, Client>,
    /// Inverse index for collision checks and recipient lookup
    nicknames: HashMap<String, ConnId>,
    /// Command receiver channel
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl Registry {
    /// Create a new Registry with the given command receiver
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            clients: HashMap::new(),
            nicknames: HashMap::new(),
            receiver,
        }
    }

    /// Run the Registry event loop
    ///
    /// Continuously receives and processes commands until all handles are
    /// dropped. Each command runs to completion before the next is taken.
    pub async fn run(mut self) {
        info!("Registry started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Registry shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                conn_id,
                nickname,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_register(conn_id, nickname, sender));
            }
            RegistryCommand::List { reply } => {
                let _ = reply.send(self.handle_list());
            }
            RegistryCommand::Send {
                conn_id,
                recipients,
                text,
                reply,
            } => {
                let _ = reply.send(self.handle_send(conn_id, recipients, text));
            }
            RegistryCommand::Remove { conn_id, reply } => {
                let _ = reply.send(self.handle_remove(conn_id));
            }
        }
    }

    /// Handle registration or rename
    fn handle_register(
        &mut self,
        conn_id: ConnId,
        nickname: Nickname,
        sender: mpsc::UnboundedSender<Delivery>,
    ) -> Result<RegisterOutcome, AppError> {
        // Exact, case-sensitive collision check against other identities
        if let Some(&holder) = self.nicknames.get(nickname.as_str()) {
            if holder != conn_id {
                debug!("Nickname '{}' already held by {}", nickname, holder);
                return Err(AppError::NicknameTaken(nickname.to_string()));
            }
        }

        let outcome = match self.clients.get_mut(&conn_id) {
            Some(client) => {
                let old = std::mem::replace(&mut client.nickname, nickname.clone());
                self.nicknames.remove(old.as_str());
                self.nicknames.insert(nickname.to_string(), conn_id);
                info!("Client {} renamed '{}' to '{}'", conn_id, old, nickname);
                RegisterOutcome::Renamed { old, new: nickname }
            }
            None => {
                self.nicknames.insert(nickname.to_string(), conn_id);
                self.clients
                    .insert(conn_id, Client::new(conn_id, nickname.clone(), sender));
                info!("Client {} registered as '{}'", conn_id, nickname);
                RegisterOutcome::Registered(nickname)
            }
        };

        debug!("Registered clients: {}", self.clients.len());
        Ok(outcome)
    }

    /// Handle a nickname snapshot request
    fn handle_list(&self) -> Vec<String> {
        let mut nicks: Vec<String> = self
            .clients
            .values()
            .map(|c| c.nickname.to_string())
            .collect();
        nicks.sort();
        nicks
    }

    /// Handle message relay
    ///
    /// Deliveries are pushed into each recipient's unbounded channel; a
    /// closed channel (recipient mid-disconnect) is ignored, so this never
    /// waits on any recipient's socket.
    fn handle_send(
        &mut self,
        conn_id: ConnId,
        recipients: Vec<String>,
        text: String,
    ) -> Result<SendOutcome, AppError> {
        let Some(sender) = self.clients.get(&conn_id) else {
            return Err(AppError::SenderNotRegistered);
        };
        let from = sender.nickname.clone();

        if recipients.len() == 1 && recipients[0] == BROADCAST {
            for client in self.clients.values().filter(|c| c.id != conn_id) {
                let _ = client.deliver(Delivery {
                    from: from.clone(),
                    text: text.clone(),
                });
            }
            debug!("Client {} broadcast {} bytes", conn_id, text.len());
            Ok(SendOutcome::Broadcast)
        } else {
            // Unregistered names are skipped without feedback
            let wanted: HashSet<&str> = recipients.iter().map(String::as_str).collect();
            for client in self
                .clients
                .values()
                .filter(|c| wanted.contains(c.nickname.as_str()))
            {
                let _ = client.deliver(Delivery {
                    from: from.clone(),
                    text: text.clone(),
                });
            }
            debug!("Client {} sent to {:?}", conn_id, recipients);
            Ok(SendOutcome::Direct(recipients))
        }
    }

    /// Handle registration removal
    fn handle_remove(&mut self, conn_id: ConnId) -> Result<(), AppError> {
        match self.clients.remove(&conn_id) {
            Some(client) => {
                self.nicknames.remove(client.nickname.as_str());
                info!("Client {} removed (was '{}')", conn_id, client.nickname);
                debug!("Registered clients: {}", self.clients.len());
                Ok(())
            }
            None => Err(AppError::UserNotFound),
        }
    }
}

/// Cloneable handle to the Registry actor
///
/// One clone per connection handler; constructed explicitly and passed down
/// from `main` rather than living in a global. Every method is a synchronous
/// round-trip: the command is queued, the actor processes it to completion,
/// and the oneshot reply resolves the call. A closed actor channel surfaces
/// as `ChannelSend`, which callers treat as fatal.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Wrap a command sender obtained from the channel `main` created
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Register or rename `conn_id` under `nickname`
    ///
    /// `delivery` is the sending end of the connection's delivery channel;
    /// the registry keeps it from the first successful registration on.
    pub async fn register(
        &self,
        conn_id: ConnId,
        nickname: Nickname,
        delivery: mpsc::UnboundedSender<Delivery>,
    ) -> Result<RegisterOutcome, AppError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Register {
                conn_id,
                nickname,
                sender: delivery,
                reply,
            })
            .await
            .map_err(|_| AppError::ChannelSend)?;
        rx.await.map_err(|_| AppError::ChannelSend)?
    }

    /// Snapshot the currently registered nicknames, sorted
    pub async fn list(&self) -> Result<Vec<String>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::List { reply })
            .await
            .map_err(|_| AppError::ChannelSend)?;
        rx.await.map_err(|_| AppError::ChannelSend)
    }

    /// Relay `text` from `conn_id` to the listed recipients
    pub async fn send_message(
        &self,
        conn_id: ConnId,
        recipients: Vec<String>,
        text: String,
    ) -> Result<SendOutcome, AppError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Send {
                conn_id,
                recipients,
                text,
                reply,
            })
            .await
            .map_err(|_| AppError::ChannelSend)?;
        rx.await.map_err(|_| AppError::ChannelSend)?
    }

    /// Drop `conn_id`'s registration
    pub async fn remove(&self, conn_id: ConnId) -> Result<(), AppError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Remove { conn_id, reply })
            .await
            .map_err(|_| AppError::ChannelSend)?;
        rx.await.map_err(|_| AppError::ChannelSend)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_registry() -> RegistryHandle {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(Registry::new(rx).run());
        RegistryHandle::new(tx)
    }

    fn nick(s: &str) -> Nickname {
        s.parse().unwrap()
    }

    /// Register a fresh identity under `name`, returning its id and
    /// delivery receiver.
    async fn join(
        registry: &RegistryHandle,
        name: &str,
    ) -> (ConnId, mpsc::UnboundedReceiver<Delivery>) {
        let conn_id = ConnId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let outcome = registry.register(conn_id, nick(name), tx).await.unwrap();
        assert_eq!(outcome, RegisterOutcome::Registered(nick(name)));
        (conn_id, rx)
    }

    #[tokio::test]
    async fn test_register_distinct_and_list() {
        let registry = spawn_registry();
        let _alice = join(&registry, "alice").await;
        let _bob = join(&registry, "bob").await;

        assert_eq!(registry.list().await.unwrap(), vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_concurrent_distinct_registrations() {
        let registry = spawn_registry();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..10 {
            let registry = registry.clone();
            tasks.spawn(async move {
                let (tx, _rx) = mpsc::unbounded_channel();
                registry
                    .register(ConnId::new(), nick(&format!("user{}", i)), tx)
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().is_ok());
        }

        let expected: Vec<String> = (0..10).map(|i| format!("user{}", i)).collect();
        assert_eq!(registry.list().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_nickname_taken_by_other_identity() {
        let registry = spawn_registry();
        let _alice = join(&registry, "alice").await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = registry.register(ConnId::new(), nick("alice"), tx).await;
        assert!(matches!(result, Err(AppError::NicknameTaken(name)) if name == "alice"));

        // Exactly one registration survives
        assert_eq!(registry.list().await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_rename_replaces_old_name() {
        let registry = spawn_registry();
        let (conn_id, _rx) = join(&registry, "alice").await;

        let (tx, _rx2) = mpsc::unbounded_channel();
        let outcome = registry.register(conn_id, nick("alicia"), tx).await.unwrap();
        assert_eq!(
            outcome,
            RegisterOutcome::Renamed {
                old: nick("alice"),
                new: nick("alicia"),
            }
        );
        assert_eq!(registry.list().await.unwrap(), vec!["alicia"]);
    }

    #[tokio::test]
    async fn test_rename_frees_old_name_for_others() {
        let registry = spawn_registry();
        let (conn_id, _rx) = join(&registry, "alice").await;

        let (tx, _rx2) = mpsc::unbounded_channel();
        registry.register(conn_id, nick("alicia"), tx).await.unwrap();

        // A new identity can now claim the freed name
        let _second = join(&registry, "alice").await;
        assert_eq!(registry.list().await.unwrap(), vec!["alice", "alicia"]);
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let registry = spawn_registry();
        let (alice_id, mut alice_rx) = join(&registry, "alice").await;
        let (_bob_id, mut bob_rx) = join(&registry, "bob").await;
        let (_carol_id, mut carol_rx) = join(&registry, "carol").await;

        let outcome = registry
            .send_message(alice_id, vec!["*".to_string()], "hello".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Broadcast);

        assert_eq!(bob_rx.recv().await.unwrap().to_line(), "alice said: hello\n");
        assert_eq!(
            carol_rx.recv().await.unwrap().to_line(),
            "alice said: hello\n"
        );
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_alone_delivers_nothing() {
        let registry = spawn_registry();
        let (alice_id, mut alice_rx) = join(&registry, "alice").await;

        let outcome = registry
            .send_message(alice_id, vec!["*".to_string()], "anyone?".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Broadcast);
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_from_unregistered_fails() {
        let registry = spawn_registry();
        let _alice = join(&registry, "alice").await;

        let result = registry
            .send_message(ConnId::new(), vec!["*".to_string()], "hi".to_string())
            .await;
        assert!(matches!(result, Err(AppError::SenderNotRegistered)));

        let result = registry
            .send_message(ConnId::new(), vec!["alice".to_string()], "hi".to_string())
            .await;
        assert!(matches!(result, Err(AppError::SenderNotRegistered)));
    }

    #[tokio::test]
    async fn test_unknown_recipients_skipped() {
        let registry = spawn_registry();
        let (alice_id, _alice_rx) = join(&registry, "alice").await;
        let (_bob_id, mut bob_rx) = join(&registry, "bob").await;

        // carol was never registered; the send still succeeds
        let outcome = registry
            .send_message(
                alice_id,
                vec!["bob".to_string(), "carol".to_string()],
                "hi".to_string(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SendOutcome::Direct(vec!["bob".to_string(), "carol".to_string()])
        );

        assert_eq!(bob_rx.recv().await.unwrap().to_line(), "alice said: hi\n");
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_direct_send_can_target_self() {
        let registry = spawn_registry();
        let (alice_id, mut alice_rx) = join(&registry, "alice").await;

        registry
            .send_message(alice_id, vec!["alice".to_string()], "echo".to_string())
            .await
            .unwrap();
        assert_eq!(alice_rx.recv().await.unwrap().to_line(), "alice said: echo\n");
    }

    #[tokio::test]
    async fn test_remove_frees_nickname() {
        let registry = spawn_registry();
        let (alice_id, _alice_rx) = join(&registry, "alice").await;

        registry.remove(alice_id).await.unwrap();
        assert!(registry.list().await.unwrap().is_empty());

        // The freed name is immediately registrable by a new identity
        let _second = join(&registry, "alice").await;
        assert_eq!(registry.list().await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_remove_unknown_identity() {
        let registry = spawn_registry();
        let result = registry.remove(ConnId::new()).await;
        assert!(matches!(result, Err(AppError::UserNotFound)));
    }
}
