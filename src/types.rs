//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `ConnId`: UUID-based unique connection identifier
//! - `Nickname`: validated nickname (only constructible through parsing)

use std::str::FromStr;

use uuid::Uuid;

use crate::error::NicknameError;

/// Maximum nickname length in characters
pub const MAX_NICKNAME_LEN: usize = 10;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe identification of one live connection.
/// Implements Hash and Eq for use as HashMap keys. Never reused after
/// disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub Uuid);

impl ConnId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registered nickname
///
/// A `Nickname` can only be built through `FromStr`, which enforces the
/// format rules: 1-10 characters, first character an ASCII letter, remaining
/// characters ASCII letters, digits, or underscore. Comparison is exact and
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nickname(String);

impl Nickname {
    /// View the nickname as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Nickname {
    type Err = NicknameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().count() > MAX_NICKNAME_LEN {
            return Err(NicknameError::TooLong);
        }
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => return Err(NicknameError::FirstChar),
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(NicknameError::Charset);
        }
        Ok(Self(s.to_string()))
    }
}

impl std::fmt::Display for Nickname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
