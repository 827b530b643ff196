//! TCP Chat Relay Library
//!
//! A line-oriented TCP chat relay built on tokio, using the Actor pattern
//! for state management: clients register a unique nickname and exchange
//! direct or broadcast messages through a central registry.
//!
//! # Features
//! - Line-delimited text protocol (`/LIST`, `/NICK`, `/MSG`)
//! - Unique nickname registration and renaming
//! - Direct messages to one or more recipients
//! - Broadcast to everyone with `*`
//! - Disconnection handling
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Registry` is the central actor owning the nickname map; commands carry
//!   `oneshot` reply senders, so every operation is a synchronous round-trip
//!   processed one at a time
//! - Each connection has a `handler` task that selects between inbound
//!   socket lines and messages relayed from peers
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_relay::{handle_connection, Registry, RegistryHandle};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:6666").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(Registry::new(cmd_rx).run());
//!     let handle = RegistryHandle::new(cmd_tx);
//!
//!     while let Ok((stream, addr)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, addr, handle.clone()));
//!     }
//! }
//! ```

pub mod client;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use error::{AppError, NicknameError, SendError};
pub use handler::handle_connection;
pub use message::{ClientCommand, Delivery, ServerReply};
pub use registry::{RegisterOutcome, Registry, RegistryCommand, RegistryHandle, SendOutcome};
pub use types::{ConnId, Nickname};
