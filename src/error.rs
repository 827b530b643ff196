//! Error types for the chat relay
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// protocol errors (reported back to the client as a text line).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Requested nickname violates the format rules
    #[error("invalid nickname: {0}")]
    InvalidNickname(#[from] NicknameError),

    /// Requested nickname is held by another connection
    #[error("nickname '{0}' is already taken")]
    NicknameTaken(String),

    /// Messaging attempted before registering a nickname
    #[error("sender is not registered")]
    SenderNotRegistered,

    /// Removal of a connection with no registry entry
    #[error("user not found")]
    UserNotFound,

    /// Client input that is not a known command
    #[error("unknown command")]
    UnknownCommand,
}

/// Nickname format violations
///
/// The `Display` strings double as the bodies of the error lines sent to
/// clients, so their wording is part of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NicknameError {
    /// More than 10 characters
    #[error("nickname can only be up to 10 characters")]
    TooLong,

    /// First character is not a letter
    #[error("nickname first character must be a letter")]
    FirstChar,

    /// A later character is not a letter, digit, or underscore
    #[error("nickname can only contain letters, numbers, or underscores")]
    Charset,
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
