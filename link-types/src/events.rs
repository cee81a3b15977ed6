//! Events dispatched on the client's event bus.
//!
//! The client turns transport frames and connection changes into these
//! values and hands each one to every registered handler.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DeviceId;

/// All events a client can dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// The server issued a batch of pairing codes.
    Qr(QrEvent),
    /// A phone accepted one of the pairing codes.
    PairSuccess(PairSuccess),
    /// The client logged in with an identity it already had.
    Connected,
    /// The server refused the connection.
    ConnectFailure {
        /// Reason given by the server.
        reason: String,
    },
    /// The connection was lost without the user asking for it.
    Disconnected,
    /// The stored identity was revoked by the server.
    LoggedOut {
        /// Reason given by the server.
        reason: String,
    },
    /// Keep-alive pings went unanswered.
    KeepAliveTimeout,
}

/// An ordered batch of pairing codes.
///
/// Codes are shown one at a time, front to back, each for `timeout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrEvent {
    /// Codes in display order.
    pub codes: Vec<String>,
    /// How long each code stays valid.
    pub timeout: Duration,
}

/// Payload of a successful pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSuccess {
    /// The identity assigned to this device.
    pub device_id: DeviceId,
    /// Platform of the phone that scanned the code.
    pub platform: String,
}
