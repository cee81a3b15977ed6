//! Values written to a pairing stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One item of a pairing stream.
///
/// A stream carries zero or more [`Code`](QrChannelItem::Code) values followed
/// by exactly one terminal value, after which it is closed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QrChannelItem {
    /// A pairing code to display.
    Code(String),
    /// Pairing completed.
    Success,
    /// The codes ran out, or the server dropped the connection, before a phone paired.
    Timeout,
    /// A connection event arrived that means the session was already past pairing.
    UnexpectedEvent,
}

impl QrChannelItem {
    /// Returns true if this item is a code rather than an outcome.
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }

    /// Returns true for the three outcome values that end a stream.
    pub fn is_terminal(&self) -> bool {
        !self.is_code()
    }

    /// The code text, if this item is a code.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Code(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for QrChannelItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => f.write_str(code),
            Self::Success => f.write_str("success"),
            Self::Timeout => f.write_str("timeout"),
            Self::UnexpectedEvent => f.write_str("err-unexpected-state"),
        }
    }
}
