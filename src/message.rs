//! Wire protocol definitions
//!
//! Line-based text protocol: one command or notification per
//! newline-terminated line. Commands are parsed into `ClientCommand`;
//! replies and pushed deliveries are rendered back to lines here so the
//! exact wording lives in one place.

use crate::error::AppError;
use crate::types::Nickname;

/// Recipient token that addresses every registered user
pub const BROADCAST: &str = "*";

/// Client → Server command
///
/// A command line is at most 3 whitespace-delimited tokens; the third token
/// is the raw remainder of the line, so message text keeps its inner
/// whitespace. Keywords are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `/LIST` - request the current nickname snapshot
    List,
    /// `/NICK <name>` - register or rename; the name is still unvalidated
    Nick { nickname: String },
    /// `/MSG <r1,r2,...|*> <text>` - send to the listed recipients
    Msg { recipients: Vec<String>, text: String },
}

impl ClientCommand {
    /// Parse one inbound line
    ///
    /// Returns `UnknownCommand` for anything that is not an exact keyword
    /// with the right number of tokens.
    pub fn parse(line: &str) -> Result<Self, AppError> {
        let line = line.trim();
        let (keyword, rest) = split_token(line);

        match keyword {
            "/LIST" if rest.is_empty() => Ok(Self::List),
            "/NICK" => {
                let (nickname, extra) = split_token(rest);
                if nickname.is_empty() || !extra.is_empty() {
                    return Err(AppError::UnknownCommand);
                }
                Ok(Self::Nick {
                    nickname: nickname.to_string(),
                })
            }
            "/MSG" => {
                let (recipients, text) = split_token(rest);
                if recipients.is_empty() || text.is_empty() {
                    return Err(AppError::UnknownCommand);
                }
                Ok(Self::Msg {
                    recipients: recipients.split(',').map(str::to_string).collect(),
                    text: text.to_string(),
                })
            }
            _ => Err(AppError::UnknownCommand),
        }
    }
}

/// Split off the next whitespace-delimited token
///
/// Returns the token and the remainder with leading whitespace stripped.
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Server → Client reply
///
/// Everything the server writes in direct response to a command.
#[derive(Debug)]
pub enum ServerReply {
    /// Snapshot of registered nicknames
    Users(Vec<String>),
    /// First registration succeeded
    Registered(Nickname),
    /// Rename succeeded
    Renamed { old: Nickname, new: Nickname },
    /// Command failed; rendered as the matching error line
    Error(AppError),
}

impl ServerReply {
    /// Render the newline-terminated wire line for this reply
    pub fn to_line(&self) -> String {
        match self {
            Self::Users(nicks) => format!("Registered users: {}\n", nicks.join(", ")),
            Self::Registered(nick) => format!("Nickname registered as '{}'\n", nick),
            Self::Renamed { old, new } => {
                format!("Nickname changed from '{}' to '{}'\n", old, new)
            }
            Self::Error(err) => error_line(err),
        }
    }
}

impl From<AppError> for ServerReply {
    fn from(err: AppError) -> Self {
        Self::Error(err)
    }
}

/// Map a protocol error to its client-visible line
///
/// Fatal errors never reach a client; anything unexpected falls back to the
/// generic invalid-command line.
fn error_line(err: &AppError) -> String {
    match err {
        AppError::InvalidNickname(e) => format!("Error: {}\n", e),
        AppError::NicknameTaken(name) => format!("Nickname '{}' is already taken\n", name),
        AppError::SenderNotRegistered => {
            "Error: You must register before sending messages\n".to_string()
        }
        _ => "Invalid command\n".to_string(),
    }
}

/// Message relayed from a peer, pushed into the recipient's delivery channel
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Sender's nickname at the time of the send
    pub from: Nickname,
    /// Message text
    pub text: String,
}

impl Delivery {
    /// Render the newline-terminated notification line
    pub fn to_line(&self) -> String {
        format!("{} said: {}\n", self.from, self.text)
    }
}
