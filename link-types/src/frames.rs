//! Frames delivered by the transport layer.
//!
//! These are already-decoded server stanzas. The client feeds them into its
//! connection state machine, which decides which [`ClientEvent`](crate::ClientEvent)
//! to dispatch.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DeviceId;

/// All frames a server can send to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// The device has no identity; here are codes for a phone to scan.
    PairDevice {
        /// Codes in display order.
        codes: Vec<String>,
        /// How long each code stays valid.
        code_timeout: Duration,
    },
    /// A phone scanned a code and the device now has an identity.
    PairSuccess {
        /// The identity assigned to this device.
        device_id: DeviceId,
        /// Platform of the phone that scanned the code.
        platform: String,
    },
    /// Login with the stored identity succeeded.
    LoginSuccess,
    /// Login with the stored identity was refused.
    LoginFailure {
        /// Reason given by the server.
        reason: String,
    },
    /// The stored identity was revoked.
    LoggedOut {
        /// Reason given by the server.
        reason: String,
    },
}
